//! Cache hierarchies

// Imports
use tgsim_util::ByteSize;

/// Cache hierarchy selector
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
#[value(rename_all = "verbatim")]
pub enum CacheClass {
	/// Generator talks to memory directly
	NoCache,

	/// Private L1 instruction and data caches
	PrivateL1,

	/// Private L1 caches backed by a private L2
	PrivateL1PrivateL2,

	/// Private L1 caches backed by a shared, banked L2
	#[allow(clippy::upper_case_acronyms)]
	MESITwoLevel,
}
impl_selector!(CacheClass, "cache class");

/// A single cache level
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct CacheLevel {
	/// Capacity
	pub size: ByteSize,

	/// Associativity
	pub assoc: u64,

	/// Line size
	pub line_size: u64,

	/// Hit latency, in clock cycles
	pub hit_cycles: u64,
}

impl CacheLevel {
	/// Line size of every level
	pub const LINE_SIZE: u64 = 64;

	/// Creates a cache level with the default line size
	#[must_use]
	pub const fn new(size: ByteSize, assoc: u64, hit_cycles: u64) -> Self {
		Self {
			size,
			assoc,
			line_size: Self::LINE_SIZE,
			hit_cycles,
		}
	}

	/// Returns the number of sets.
	///
	/// Returns `0` if the geometry isn't valid.
	#[must_use]
	pub const fn num_sets(&self) -> u64 {
		let set_size = self.assoc * self.line_size;
		match set_size {
			0 => 0,
			_ if self.size.bytes() % set_size != 0 => 0,
			_ => self.size.bytes() / set_size,
		}
	}
}

/// Cache hierarchy
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CacheHierarchy {
	/// Selector this hierarchy was built from
	pub class: CacheClass,

	/// L1 instruction cache
	pub l1i: Option<CacheLevel>,

	/// L1 data cache
	pub l1d: Option<CacheLevel>,

	/// L2 cache, split evenly across `num_l2_banks` banks
	pub l2: Option<CacheLevel>,

	/// Number of L2 banks
	pub num_l2_banks: usize,
}

impl CacheHierarchy {
	/// Returns all levels, with their names
	pub fn levels(&self) -> impl Iterator<Item = (&'static str, &CacheLevel)> {
		[("l1i", &self.l1i), ("l1d", &self.l1d), ("l2", &self.l2)]
			.into_iter()
			.filter_map(|(name, level)| level.as_ref().map(|level| (name, level)))
	}

	/// Returns the levels traffic passes through, from the generator outwards
	pub fn data_path(&self) -> impl Iterator<Item = (&'static str, &CacheLevel)> {
		self.levels().filter(|&(name, _)| name != "l1i")
	}

	/// Returns the line size, if any caches exist
	#[must_use]
	pub fn line_size(&self) -> Option<u64> {
		self.levels().map(|(_, level)| level.line_size).max()
	}
}

/// L1 size
pub const L1_SIZE: ByteSize = ByteSize::kib(32);

/// L2 size
pub const L2_SIZE: ByteSize = ByteSize::kib(256);

/// Classic L1 hit latency, in cycles (tag + data)
const L1_HIT_CYCLES: u64 = 2;

/// Classic L2 hit latency, in cycles (tag + data)
const L2_HIT_CYCLES: u64 = 20;

/// Creates a cache hierarchy from its selector
#[must_use]
pub fn cache_factory(class: CacheClass) -> CacheHierarchy {
	let l1 = CacheLevel::new(L1_SIZE, 8, L1_HIT_CYCLES);
	match class {
		CacheClass::NoCache => CacheHierarchy {
			class,
			l1i: None,
			l1d: None,
			l2: None,
			num_l2_banks: 0,
		},
		CacheClass::PrivateL1 => CacheHierarchy {
			class,
			l1i: Some(l1),
			l1d: Some(l1),
			l2: None,
			num_l2_banks: 0,
		},
		CacheClass::PrivateL1PrivateL2 => CacheHierarchy {
			class,
			l1i: Some(l1),
			l1d: Some(l1),
			l2: Some(CacheLevel::new(L2_SIZE, 16, L2_HIT_CYCLES)),
			num_l2_banks: 1,
		},
		CacheClass::MESITwoLevel => self::mesi_two_level(1),
	}
}

/// Creates a two-level hierarchy with a shared L2 split across `num_l2_banks` banks
#[must_use]
pub fn mesi_two_level(num_l2_banks: usize) -> CacheHierarchy {
	let l1 = CacheLevel::new(L1_SIZE, 8, L1_HIT_CYCLES);
	CacheHierarchy {
		class: CacheClass::MESITwoLevel,
		l1i: Some(l1),
		l1d: Some(l1),
		l2: Some(CacheLevel::new(L2_SIZE, 4, L2_HIT_CYCLES)),
		num_l2_banks,
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::ConfigError};

	#[test]
	fn every_class_builds() {
		for &class in <CacheClass as clap::ValueEnum>::value_variants() {
			let hierarchy = cache_factory(class);
			assert_eq!(hierarchy.class, class);
			for (name, level) in hierarchy.levels() {
				assert_ne!(level.num_sets(), 0, "{class}: {name} has invalid geometry");
			}
		}
	}

	#[test]
	fn private_l1_sizes() {
		let hierarchy = cache_factory(CacheClass::PrivateL1);
		assert_eq!(hierarchy.l1i.map(|level| level.size), Some(ByteSize::kib(32)));
		assert_eq!(hierarchy.l1d.map(|level| level.size), Some(ByteSize::kib(32)));
		assert_eq!(hierarchy.l2, None);
		assert_eq!(hierarchy.data_path().map(|(name, _)| name).collect::<Vec<_>>(), ["l1d"]);
	}

	#[test]
	fn two_level_geometry() {
		let hierarchy = cache_factory(CacheClass::MESITwoLevel);
		let l1d = hierarchy.l1d.unwrap();
		let l2 = hierarchy.l2.unwrap();
		assert_eq!((l1d.size, l1d.assoc), (ByteSize::kib(32), 8));
		assert_eq!((l2.size, l2.assoc), (ByteSize::kib(256), 4));
		assert_eq!(hierarchy.num_l2_banks, 1);
		assert_eq!(mesi_two_level(2).num_l2_banks, 2);
		assert_eq!(hierarchy.data_path().map(|(name, _)| name).collect::<Vec<_>>(), ["l1d", "l2"]);
	}

	#[test]
	fn no_cache_has_no_levels() {
		let hierarchy = cache_factory(CacheClass::NoCache);
		assert_eq!(hierarchy.levels().count(), 0);
		assert_eq!(hierarchy.line_size(), None);
	}

	#[test]
	fn unknown_cache_class() {
		let err = "L3Only".parse::<CacheClass>().unwrap_err();
		assert_eq!(
			err,
			ConfigError::UnknownSelector {
				kind:     "cache class",
				value:    "L3Only".to_owned(),
				expected: "NoCache, PrivateL1, PrivateL1PrivateL2, MESITwoLevel".to_owned(),
			}
		);
	}
}
