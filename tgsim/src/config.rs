//! Configuration

// Imports
use {
	crate::components::{CacheClass, GeneratorClass, GupsClass, MemoryClass, TrafficIntensity},
	anyhow::Context,
	std::{fs, path::PathBuf},
	tgsim_util::SimDuration,
};

/// Configuration error.
///
/// Raised while validating a run's configuration, before any engine state
/// or output files exist.
#[derive(PartialEq, Clone, Debug, thiserror::Error)]
pub enum ConfigError {
	/// Selector outside of its closed set
	#[error("Unknown {kind} {value:?}, expected one of: {expected}")]
	UnknownSelector {
		kind:     &'static str,
		value:    String,
		expected: String,
	},

	/// Value failed parsing or is out of range
	#[error("Invalid {what} {value}: {reason}")]
	InvalidValue {
		what:   &'static str,
		value:  String,
		reason: String,
	},

	/// Components cannot be wired together
	#[error("Unable to connect board: {0}")]
	Topology(String),
}

/// Engine configuration
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Seed for random traffic and latency variance
	pub seed: u64,

	/// Maximum simulated time, e.g. `"10ms"`.
	///
	/// Reaching it stops the current phase with an anomalous exit.
	#[serde(with = "sim_time")]
	pub max_time: Option<SimDuration>,

	/// Maximum outstanding requests per generator core
	pub max_outstanding: usize,

	/// Progress output period (in seconds of wall time)
	pub progress_period_secs: f64,
}

impl EngineConfig {
	/// Reads the configuration from a json file
	pub fn from_file(path: &std::path::Path) -> Result<Self, anyhow::Error> {
		let config_file = fs::File::open(path).with_context(|| format!("Unable to open config file {path:?}"))?;
		let config = serde_json::from_reader::<_, Self>(config_file)
			.with_context(|| format!("Unable to parse config file {path:?}"))?;
		anyhow::ensure!(
			config.max_outstanding > 0,
			"Config file {path:?}: `max_outstanding` must be positive"
		);

		Ok(config)
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			seed:                 0x5eed,
			max_time:             None,
			max_outstanding:      128,
			progress_period_secs: 1.0,
		}
	}
}

/// Simulated times, as strings with a unit
mod sim_time {
	use {
		serde::{Deserialize, Deserializer, Serializer},
		tgsim_util::SimDuration,
	};

	pub fn serialize<S: Serializer>(time: &Option<SimDuration>, serializer: S) -> Result<S::Ok, S::Error> {
		match time {
			Some(time) => serializer.serialize_some(&format!("{}ps", time.as_picos())),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SimDuration>, D::Error> {
		Option::<String>::deserialize(deserializer)?
			.map(|time| time.parse::<SimDuration>().map_err(serde::de::Error::custom))
			.transpose()
	}
}

/// Experiment to run
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Experiment {
	/// Staged linear traffic over a cache hierarchy and a simple memory
	CacheTest { cache_class: CacheClass },

	/// Linear or random traffic straight into a multi-channel memory
	MemoryTest {
		generator_class:   GeneratorClass,
		traffic_intensity: TrafficIntensity,
		memory_class:      MemoryClass,
		num_channels:      usize,
	},

	/// Linear traffic over a two-level cache into dual-channel DDR4
	MultiChannel,

	/// Random read-modify-write updates over a cache hierarchy
	GupsTest {
		gups_class:   GupsClass,
		cache_class:  CacheClass,
		update_limit: u64,
		num_cores:    usize,
	},
}

/// Configuration of a single run
#[derive(PartialEq, Clone, Debug)]
pub struct RunConfig {
	/// Experiment
	pub experiment: Experiment,

	/// Output directory
	pub outdir: PathBuf,

	/// Engine configuration
	pub engine: EngineConfig,
}

#[cfg(test)]
mod tests {
	use {super::*, std::io::Write};

	#[test]
	fn partial_config_file_uses_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "seed": 7, "max_time": "1.5us" }}"#).unwrap();

		let config = EngineConfig::from_file(file.path()).unwrap();
		assert_eq!(config, EngineConfig {
			seed:     7,
			max_time: Some(SimDuration::from_picos(1_500_000)),
			..EngineConfig::default()
		});
	}

	#[test]
	fn config_file_rejects_unitless_times() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "max_time": "1000000" }}"#).unwrap();

		let err = EngineConfig::from_file(file.path()).unwrap_err();
		assert!(format!("{err:#}").contains("Unknown unit"), "{err:#}");
	}

	#[test]
	fn max_time_round_trips() {
		let config = EngineConfig {
			max_time: Some(SimDuration::from_micros(250)),
			..EngineConfig::default()
		};
		let value = serde_json::to_value(&config).unwrap();
		assert_eq!(value["max_time"], "250000000ps");
		assert_eq!(serde_json::from_value::<EngineConfig>(value).unwrap(), config);
	}

	#[test]
	fn config_file_rejects_unknown_fields() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "sead": 7 }}"#).unwrap();

		assert!(EngineConfig::from_file(file.path()).is_err());
	}

	#[test]
	fn config_file_rejects_zero_outstanding() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "max_outstanding": 0 }}"#).unwrap();

		assert!(EngineConfig::from_file(file.path()).is_err());
	}
}
