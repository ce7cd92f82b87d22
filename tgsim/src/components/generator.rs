//! Traffic generators

// Imports
use {
	crate::ConfigError,
	std::ops::Range,
	tgsim_util::{Bandwidth, ByteSize, SimDuration},
};

/// Generator selector for single-pattern traffic
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
#[value(rename_all = "verbatim")]
pub enum GeneratorClass {
	/// Linear address sweep
	Linear,

	/// Uniformly random addresses
	Random,
}
impl_selector!(GeneratorClass, "generator class");

/// Traffic intensity selector
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
#[value(rename_all = "verbatim")]
pub enum TrafficIntensity {
	/// 24 GB/s per channel
	Loaded,

	/// 1 GB/s
	Unloaded,
}
impl_selector!(TrafficIntensity, "traffic intensity");

/// GUPS generator selector
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
pub enum GupsClass {
	/// Single core
	#[value(name = "GUPS")]
	Gups,

	/// Embarrassingly parallel, each core updates its own table partition
	#[value(name = "GUPSEP")]
	GupsEp,

	/// Parallel, all cores update the whole table
	#[value(name = "GUPSPAR")]
	GupsPar,
}
impl_selector!(GupsClass, "GUPS class");

/// Address pattern of a traffic segment
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TrafficPattern {
	Linear,
	Random,
}

impl From<GeneratorClass> for TrafficPattern {
	fn from(class: GeneratorClass) -> Self {
		match class {
			GeneratorClass::Linear => Self::Linear,
			GeneratorClass::Random => Self::Random,
		}
	}
}

/// Traffic configuration.
///
/// The traffic ends once `duration` elapses or `data_limit` bytes were
/// requested, whichever comes first.
#[derive(PartialEq, Clone, Debug)]
pub struct TrafficConfig {
	/// Address pattern
	pub pattern: TrafficPattern,

	/// Duration
	pub duration: Option<SimDuration>,

	/// Data limit
	pub data_limit: Option<ByteSize>,

	/// Request rate
	pub rate: Bandwidth,

	/// Address range
	pub addr_range: Range<u64>,

	/// Request size
	pub block_size: u64,

	/// Percentage of reads (0..=100)
	pub rd_perc: u8,
}

impl TrafficConfig {
	/// Default address range end
	pub const DEFAULT_MAX_ADDR: u64 = 32768;
	/// Default request size
	pub const DEFAULT_BLOCK_SIZE: u64 = 64;

	/// Creates a read-only traffic configuration over the default address range
	#[must_use]
	pub fn new(pattern: TrafficPattern, rate: Bandwidth) -> Self {
		Self {
			pattern,
			duration: None,
			data_limit: None,
			rate,
			addr_range: 0..Self::DEFAULT_MAX_ADDR,
			block_size: Self::DEFAULT_BLOCK_SIZE,
			rd_perc: 100,
		}
	}

	#[must_use]
	pub fn with_duration(self, duration: SimDuration) -> Self {
		Self {
			duration: Some(duration),
			..self
		}
	}

	#[must_use]
	pub fn with_data_limit(self, data_limit: ByteSize) -> Self {
		Self {
			data_limit: Some(data_limit),
			..self
		}
	}

	#[must_use]
	pub fn with_addr_range(self, addr_range: Range<u64>) -> Self {
		Self { addr_range, ..self }
	}

	/// Returns whether this traffic eventually stops on its own
	#[must_use]
	pub fn is_bounded(&self) -> bool {
		self.duration.is_some() || self.data_limit.is_some()
	}
}

/// GUPS configuration
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct GupsConfig {
	/// Class
	pub class: GupsClass,

	/// Table start address
	pub start_addr: u64,

	/// Table size
	pub mem_size: ByteSize,

	/// Total number of updates, split across all cores.
	///
	/// `0` means four updates per table element.
	pub update_limit: u64,

	/// Number of cores
	pub num_cores: usize,

	/// Table element size
	pub element_size: u64,
}

impl GupsConfig {
	/// Returns the total number of updates
	#[must_use]
	pub fn total_updates(&self) -> u64 {
		match self.update_limit {
			0 => 4 * (self.mem_size.bytes() / self.element_size),
			limit => limit,
		}
	}

	/// Returns the table range updated by core `core_idx`
	#[must_use]
	pub fn core_range(&self, core_idx: usize) -> Range<u64> {
		let table = self.start_addr..self.start_addr + self.mem_size.bytes();
		match self.class {
			GupsClass::Gups | GupsClass::GupsPar => table,
			GupsClass::GupsEp => {
				let elements = self.mem_size.bytes() / self.element_size / self.num_cores as u64;
				let partition = elements * self.element_size;
				let start = table.start + core_idx as u64 * partition;
				start..start + partition
			},
		}
	}

	/// Returns the updates issued by core `core_idx`.
	///
	/// The remainder of the split goes to the last core.
	#[must_use]
	pub fn core_updates(&self, core_idx: usize) -> u64 {
		let total = self.total_updates();
		let num_cores = self.num_cores as u64;
		let share = total / num_cores;
		match core_idx as u64 + 1 == num_cores {
			true => share + total % num_cores,
			false => share,
		}
	}
}

/// Generator specification
#[derive(PartialEq, Clone, Debug)]
pub enum GeneratorSpec {
	/// Single traffic configuration, restarted on every traffic start
	Traffic(TrafficConfig),

	/// Ordered segments, one consumed on every traffic start
	Complex(Vec<TrafficConfig>),

	/// Random read-modify-write updates
	Gups(GupsConfig),
}

impl GeneratorSpec {
	/// Returns the number of generator cores
	#[must_use]
	pub fn num_cores(&self) -> usize {
		match self {
			Self::Traffic(_) | Self::Complex(_) => 1,
			Self::Gups(config) => config.num_cores,
		}
	}

	/// Returns all traffic configurations
	pub fn traffic_configs(&self) -> impl Iterator<Item = &TrafficConfig> {
		let configs: &[TrafficConfig] = match self {
			Self::Traffic(config) => std::slice::from_ref(config),
			Self::Complex(configs) => configs,
			Self::Gups(_) => &[],
		};
		configs.iter()
	}

	/// Returns the address range touched by this generator
	#[must_use]
	pub fn addr_span(&self) -> Range<u64> {
		match self {
			Self::Gups(config) => config.start_addr..config.start_addr + config.mem_size.bytes(),
			_ => {
				let start = self.traffic_configs().map(|config| config.addr_range.start).min();
				let end = self.traffic_configs().map(|config| config.addr_range.end).max();
				start.unwrap_or(0)..end.unwrap_or(0)
			},
		}
	}

	/// Returns the largest request size
	#[must_use]
	pub fn max_request_size(&self) -> u64 {
		match self {
			Self::Gups(config) => config.element_size,
			_ => self.traffic_configs().map(|config| config.block_size).max().unwrap_or(0),
		}
	}
}

/// Duration of single-pattern traffic
pub const TRAFFIC_DURATION: SimDuration = SimDuration::from_micros(250);

/// GUPS table size
pub const GUPS_TABLE_SIZE: ByteSize = ByteSize::mib(32);

/// GUPS table element size
pub const GUPS_ELEMENT_SIZE: u64 = 8;

/// Maximum number of GUPS cores
pub const MAX_GUPS_CORES: usize = 64;

/// Translates a traffic intensity into a request rate
#[must_use]
pub fn translate_intensity(intensity: TrafficIntensity, num_channels: usize) -> Bandwidth {
	match intensity {
		TrafficIntensity::Loaded => Bandwidth::from_gb_per_sec(24.0 * num_channels as f64),
		TrafficIntensity::Unloaded => Bandwidth::from_gb_per_sec(1.0),
	}
}

/// Creates a single-pattern generator sweeping `[0, mem_size)` for [`TRAFFIC_DURATION`]
#[must_use]
pub fn generator_factory(class: GeneratorClass, rate: Bandwidth, mem_size: ByteSize) -> GeneratorSpec {
	let config = TrafficConfig::new(class.into(), rate)
		.with_duration(TRAFFIC_DURATION)
		.with_addr_range(0..mem_size.bytes());

	GeneratorSpec::Traffic(config)
}

/// Creates a complex generator with one `pattern` segment per data limit, in order
#[must_use]
pub fn complex_generator_factory(pattern: TrafficPattern, rate: Bandwidth, data_limits: &[ByteSize]) -> GeneratorSpec {
	let segments = data_limits
		.iter()
		.map(|&data_limit| TrafficConfig::new(pattern, rate).with_data_limit(data_limit))
		.collect();

	GeneratorSpec::Complex(segments)
}

/// Creates a GUPS generator over a [`GUPS_TABLE_SIZE`] table at address 0
pub fn gups_factory(class: GupsClass, update_limit: u64, num_cores: usize) -> Result<GeneratorSpec, ConfigError> {
	let invalid_cores = |reason: &str| ConfigError::InvalidValue {
		what:   "core count",
		value:  num_cores.to_string(),
		reason: reason.to_owned(),
	};

	match (class, num_cores) {
		(_, 0) => return Err(invalid_cores("must be positive")),
		(_, num_cores) if num_cores > MAX_GUPS_CORES => return Err(invalid_cores("too many cores")),
		(GupsClass::Gups, num_cores) if num_cores > 1 => return Err(invalid_cores("GUPS runs on a single core")),
		_ => (),
	}

	Ok(GeneratorSpec::Gups(GupsConfig {
		class,
		start_addr: 0,
		mem_size: GUPS_TABLE_SIZE,
		update_limit,
		num_cores,
		element_size: GUPS_ELEMENT_SIZE,
	}))
}
