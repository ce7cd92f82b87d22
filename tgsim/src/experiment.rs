//! Experiments
//!
//! Builds the board and phases of each experiment, then runs them.

// Imports
use {
	crate::{
		components::{
			cache::mesi_two_level,
			cache_factory,
			complex_generator_factory,
			generator_factory,
			gups_factory,
			memory::{single_channel_memory, MultiChannelMemory},
			memory_factory,
			translate_intensity,
			AddrMapping,
			CacheClass,
			DramInterface,
			GeneratorSpec,
			MemorySpec,
			TrafficConfig,
			TrafficPattern,
		},
		driver::{Phase, PhaseOutput, RunReport, StagedRun},
		ConfigError,
		ConnectedBoard,
		Experiment,
		ModelEngine,
		RunConfig,
		TestBoard,
	},
	anyhow::Context,
	std::path::Path,
	tgsim_util::{Bandwidth, ByteSize, Frequency, SimDuration},
};

/// Board clock frequency
pub const CLK_FREQ: Frequency = Frequency::from_hz(4_000_000_000);

/// Cache test data limits, one phase each
pub const CACHE_TEST_DATA_LIMITS: [ByteSize; 3] = [ByteSize(0x8000), ByteSize(0x40000), ByteSize(0x100000)];

/// Cache test and multi-channel test request rate, in GB/s
const FAST_RATE_GB: f64 = 1000.0;

/// Multi-channel test traffic duration
const MULTI_CHANNEL_DURATION: SimDuration = SimDuration::from_micros(100);

/// Experiment plan.
///
/// A connected board together with the phases to run on it.
#[derive(Debug)]
pub struct ExperimentPlan {
	/// Board
	pub board: ConnectedBoard,

	/// Phases
	pub phases: Vec<Phase>,

	/// Console line printed once all phases are done
	pub final_message: Option<&'static str>,
}

impl ExperimentPlan {
	/// Builds the plan of `experiment`.
	///
	/// # Errors
	/// Returns an error if any component is misconfigured or can't be connected.
	pub fn build(experiment: &Experiment) -> Result<Self, ConfigError> {
		let plan = match *experiment {
			Experiment::CacheTest { cache_class } => {
				let generator = complex_generator_factory(
					TrafficPattern::Linear,
					Bandwidth::from_gb_per_sec(FAST_RATE_GB),
					&CACHE_TEST_DATA_LIMITS,
				);
				let board = TestBoard::new(CLK_FREQ, generator, cache_factory(cache_class), single_channel_memory())
					.connect_things()?;

				let phases = CACHE_TEST_DATA_LIMITS
					.iter()
					.enumerate()
					.map(|(phase_idx, data_limit)| Phase {
						banner:          match phase_idx {
							0 => format!("Beginning simulation! With {data_limit} data limit"),
							_ => format!("Resuming simulation! With {data_limit} data limit"),
						},
						output:          PhaseOutput::Labeled(data_limit.to_string()),
						dump_full_stats: true,
					})
					.collect();

				Self {
					board,
					phases,
					final_message: Some("Simulation finished!"),
				}
			},

			Experiment::MemoryTest {
				generator_class,
				traffic_intensity,
				memory_class,
				num_channels,
			} => {
				let memory = memory_factory(memory_class, num_channels)?;
				let rate = translate_intensity(traffic_intensity, num_channels);
				let generator = generator_factory(generator_class, rate, memory.size());
				let board = TestBoard::new(CLK_FREQ, generator, cache_factory(CacheClass::NoCache), memory)
					.connect_things()?;

				Self {
					board,
					phases: vec![Phase {
						banner:          "Beginning simulation".to_owned(),
						output:          PhaseOutput::Processor,
						dump_full_stats: false,
					}],
					final_message: Some("Simulation finished"),
				}
			},

			Experiment::MultiChannel => {
				let generator = GeneratorSpec::Traffic(
					TrafficConfig::new(TrafficPattern::Linear, Bandwidth::from_gb_per_sec(FAST_RATE_GB))
						.with_duration(MULTI_CHANNEL_DURATION),
				);
				let memory = MultiChannelMemory {
					interleaving_size: 64,
					size: ByteSize::gib(32),
					..MultiChannelMemory::new(DramInterface::DDR4_2400_8X8, 2, AddrMapping::RoRaBaCoCh)
				};
				let board = TestBoard::new(
					CLK_FREQ,
					generator,
					mesi_two_level(2),
					MemorySpec::MultiChannel(memory),
				)
				.connect_things()?;

				Self {
					board,
					phases: vec![Phase {
						banner:          "Beginning simulation!".to_owned(),
						output:          PhaseOutput::Discard,
						dump_full_stats: false,
					}],
					final_message: None,
				}
			},

			Experiment::GupsTest {
				gups_class,
				cache_class,
				update_limit,
				num_cores,
			} => {
				let generator = gups_factory(gups_class, update_limit, num_cores)?;
				let board = TestBoard::new(CLK_FREQ, generator, cache_factory(cache_class), single_channel_memory())
					.connect_things()?;

				Self {
					board,
					phases: vec![Phase {
						banner:          format!("Beginning simulation! With {gups_class} on {num_cores} core(s)"),
						output:          PhaseOutput::Processor,
						dump_full_stats: true,
					}],
					final_message: Some("Simulation finished!"),
				}
			},
		};

		Ok(plan)
	}

	/// Returns the staged run of this plan, writing to `outdir`
	pub fn staged_run(&self, outdir: &Path) -> StagedRun {
		let run = StagedRun::new(self.phases.clone(), outdir);
		match self.final_message {
			Some(final_message) => run.with_final_message(final_message),
			None => run,
		}
	}
}

/// Runs an experiment.
///
/// Configuration is fully validated before the output directory is created.
pub fn run(config: &RunConfig) -> Result<RunReport, anyhow::Error> {
	let plan = ExperimentPlan::build(&config.experiment).context("Invalid configuration")?;
	tracing::info!(experiment = ?config.experiment, outdir = ?config.outdir, "Running experiment");

	let run = plan.staged_run(&config.outdir);
	let mut engine = ModelEngine::instantiate(plan.board, &config.engine).context("Unable to instantiate engine")?;
	let report = run.run(&mut engine).context("Unable to run experiment")?;

	tracing::info!(phases = report.phases.len(), "Finished experiment");
	Ok(report)
}
