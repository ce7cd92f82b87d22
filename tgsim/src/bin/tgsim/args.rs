//! Arguments

// Imports
use {
	std::path::PathBuf,
	tgsim::{
		components::{CacheClass, GeneratorClass, GupsClass, MemoryClass, TrafficIntensity},
		Experiment,
	},
};

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
#[clap(about = "Runs traffic generators over a cache hierarchy and memory test board")]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file", global = true)]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append", global = true)]
	pub log_file_append: bool,

	/// Output directory
	#[clap(long = "outdir", default_value = "m5out", global = true)]
	pub outdir: PathBuf,

	/// Engine config file
	#[clap(long = "config", global = true)]
	pub config_file: Option<PathBuf>,

	/// Experiment
	#[clap(subcommand)]
	pub experiment: ExperimentArgs,
}

/// Experiment arguments
#[derive(Debug)]
#[derive(clap::Subcommand)]
pub enum ExperimentArgs {
	/// Linear traffic in 3 phases of increasing data limits over a cache hierarchy
	CacheTest {
		/// Cache hierarchy
		#[clap(value_enum)]
		cache_class: CacheClass,
	},

	/// Linear or random traffic straight into a multi-channel memory
	MemoryTest {
		/// Generator
		#[clap(value_enum)]
		generator_class: GeneratorClass,

		/// Traffic intensity
		#[clap(value_enum)]
		traffic_intensity: TrafficIntensity,

		/// Memory
		#[clap(value_enum)]
		memory_class: MemoryClass,

		/// Number of memory channels
		num_channels: usize,
	},

	/// Linear traffic over a two-level, 2 bank, cache into dual-channel DDR4
	MultiChannel,

	/// GUPS updates over a cache hierarchy
	GupsTest {
		/// GUPS generator
		#[clap(value_enum)]
		gups_class: GupsClass,

		/// Cache hierarchy
		#[clap(value_enum)]
		cache_class: CacheClass,

		/// Total number of updates (0 for 4 per table element)
		update_limit: u64,

		/// Number of cores
		#[clap(default_value_t = 1)]
		num_cores: usize,
	},
}

impl From<ExperimentArgs> for Experiment {
	fn from(args: ExperimentArgs) -> Self {
		match args {
			ExperimentArgs::CacheTest { cache_class } => Self::CacheTest { cache_class },
			ExperimentArgs::MemoryTest {
				generator_class,
				traffic_intensity,
				memory_class,
				num_channels,
			} => Self::MemoryTest {
				generator_class,
				traffic_intensity,
				memory_class,
				num_channels,
			},
			ExperimentArgs::MultiChannel => Self::MultiChannel,
			ExperimentArgs::GupsTest {
				gups_class,
				cache_class,
				update_limit,
				num_cores,
			} => Self::GupsTest {
				gups_class,
				cache_class,
				update_limit,
				num_cores,
			},
		}
	}
}
