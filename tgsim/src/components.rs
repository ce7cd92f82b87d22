//! Components
//!
//! Factories for the three pluggable parts of a test board: the traffic
//! generator, the cache hierarchy and the memory.
//!
//! Each factory is keyed by a closed selector enum. Strings are only
//! accepted when parsing a selector, so factories themselves are total.

/// Implements `FromStr` and `Display` for a selector enum
macro_rules! impl_selector {
	($ty:ty, $kind:literal) => {
		impl std::str::FromStr for $ty {
			type Err = $crate::ConfigError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				$crate::components::parse_selector($kind, s)
			}
		}

		impl std::fmt::Display for $ty {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				match clap::ValueEnum::to_possible_value(self) {
					Some(value) => f.pad(value.get_name()),
					None => write!(f, "{:?}", self),
				}
			}
		}
	};
}

// Modules
pub mod cache;
pub mod generator;
pub mod memory;

// Exports
pub use self::{
	cache::{cache_factory, CacheClass, CacheHierarchy, CacheLevel},
	generator::{
		complex_generator_factory,
		generator_factory,
		gups_factory,
		translate_intensity,
		GeneratorClass,
		GeneratorSpec,
		GupsClass,
		GupsConfig,
		TrafficConfig,
		TrafficIntensity,
		TrafficPattern,
	},
	memory::{memory_factory, AddrMapping, DramInterface, MemoryClass, MemorySpec},
};

// Imports
use {crate::ConfigError, itertools::Itertools};

/// Parses a selector of kind `kind` from `value`.
///
/// Matching is case-sensitive.
pub fn parse_selector<T: clap::ValueEnum + 'static>(kind: &'static str, value: &str) -> Result<T, ConfigError> {
	<T as clap::ValueEnum>::from_str(value, false).map_err(|_| ConfigError::UnknownSelector {
		kind,
		value: value.to_owned(),
		expected: self::selector_names::<T>().join(", "),
	})
}

/// Returns the names of all selectors of `T`, in declaration order
pub fn selector_names<T: clap::ValueEnum + 'static>() -> impl Iterator<Item = String> {
	T::value_variants()
		.iter()
		.filter_map(|variant| variant.to_possible_value())
		.map(|value| value.get_name().to_owned())
}
