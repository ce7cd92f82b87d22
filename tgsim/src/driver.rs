//! Staged run driver
//!
//! Runs a sequence of phases over an [`Engine`]. Each phase starts the
//! generator's traffic, simulates until an exit event, then dumps the
//! statistics gathered since the previous phase.

// Imports
use {
	crate::{Engine, ExitCause, ExitEvent, Tick},
	anyhow::Context,
	itertools::Itertools,
	std::{
		fs,
		io::{self, Write},
		path::{Path, PathBuf},
	},
	tgsim_util::FlattenStats,
};

/// Phase of a staged run
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Phase {
	/// Console line printed when the phase starts
	pub banner: String,

	/// Where the processor statistics go
	pub output: PhaseOutput,

	/// Whether to also append all statistics to `stats.txt`
	pub dump_full_stats: bool,
}

/// Processor statistics output of a phase
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum PhaseOutput {
	/// `stats_<label>.json`
	Labeled(String),

	/// `processor_stats.json`
	Processor,

	/// Not written
	Discard,
}

impl PhaseOutput {
	/// Returns the output file name, if any
	#[must_use]
	pub fn file_name(&self) -> Option<String> {
		match self {
			Self::Labeled(label) => Some(format!("stats_{label}.json")),
			Self::Processor => Some("processor_stats.json".to_owned()),
			Self::Discard => None,
		}
	}
}

/// Driver state
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum DriverState {
	/// Nothing ran yet
	Idle,

	/// About to run phase `.0`
	Running(usize),

	/// Phase `.0` exited, statistics pending
	Draining(usize),

	/// All phases done
	Terminal,
}

/// Report of a finished phase
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct PhaseReport {
	/// Phase index
	pub phase_idx: usize,

	/// Tick the phase started at
	pub start_tick: Tick,

	/// Tick the phase exited at
	pub exit_tick: Tick,

	/// Exit cause
	pub cause: ExitCause,

	/// Processor statistics file, if written
	pub stats_path: Option<PathBuf>,
}

/// Report of a whole run
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct RunReport {
	/// Phases, in execution order
	pub phases: Vec<PhaseReport>,
}

/// Staged run
#[derive(Debug)]
pub struct StagedRun {
	/// Phases
	phases: Vec<Phase>,

	/// Console line printed once all phases are done
	final_message: Option<String>,

	/// Output directory
	outdir: PathBuf,

	/// Current state
	state: DriverState,

	/// Exit of the phase being drained, with its start tick
	pending_exit: Option<(Tick, ExitEvent)>,

	/// Report
	report: RunReport,
}

impl StagedRun {
	/// Name of the file all statistics are appended to
	pub const FULL_STATS_FILE_NAME: &'static str = "stats.txt";

	/// Creates a new staged run writing to `outdir`
	pub fn new(phases: Vec<Phase>, outdir: impl Into<PathBuf>) -> Self {
		Self {
			phases,
			final_message: None,
			outdir: outdir.into(),
			state: DriverState::Idle,
			pending_exit: None,
			report: RunReport::default(),
		}
	}

	/// Sets the message printed once all phases are done
	#[must_use]
	pub fn with_final_message(self, final_message: impl Into<String>) -> Self {
		Self {
			final_message: Some(final_message.into()),
			..self
		}
	}

	/// Returns the current state
	pub fn state(&self) -> DriverState {
		self.state
	}

	/// Runs all phases, printing progress to stdout
	pub fn run<E: Engine>(self, engine: &mut E) -> Result<RunReport, anyhow::Error> {
		let stdout = io::stdout();
		let mut console = stdout.lock();
		self.run_with_console(engine, &mut console)
	}

	/// Runs all phases, printing progress to `console`
	pub fn run_with_console<E: Engine>(
		mut self,
		engine: &mut E,
		console: &mut impl Write,
	) -> Result<RunReport, anyhow::Error> {
		while self.state != DriverState::Terminal {
			self.step(engine, console)?;
		}

		Ok(self.report)
	}

	/// Advances the driver by one state.
	///
	/// Returns the new state.
	///
	/// # Errors
	/// Returns an error if the engine fails, if any output can't be written, or
	/// if already in the terminal state.
	pub fn step<E: Engine>(&mut self, engine: &mut E, console: &mut impl Write) -> Result<DriverState, anyhow::Error> {
		self.state = match self.state {
			DriverState::Idle => {
				fs::create_dir_all(&self.outdir)
					.with_context(|| format!("Unable to create output directory {:?}", self.outdir))?;

				match self.phases.is_empty() {
					true => self.finish(console)?,
					false => DriverState::Running(0),
				}
			},

			DriverState::Running(phase_idx) => {
				let phase = &self.phases[phase_idx];
				let start_tick = engine.cur_tick();
				engine
					.start_traffic()
					.with_context(|| format!("Unable to start traffic for phase {phase_idx}"))?;

				writeln!(console, "{}", phase.banner).context("Unable to write to console")?;
				tracing::info!(phase_idx, start_tick, "Starting phase");
				let exit = engine
					.simulate()
					.with_context(|| format!("Unable to simulate phase {phase_idx}"))?;
				writeln!(console, "Exiting @ tick {} because {}.", exit.tick, exit.cause)
					.context("Unable to write to console")?;

				if exit.cause.is_anomaly() {
					tracing::warn!(phase_idx, tick = exit.tick, cause = %exit.cause, "Phase exited abnormally");
				}

				self.pending_exit = Some((start_tick, exit));
				DriverState::Draining(phase_idx)
			},

			DriverState::Draining(phase_idx) => {
				let (start_tick, exit) = self
					.pending_exit
					.take()
					.context("Draining a phase that never exited")?;
				let phase = &self.phases[phase_idx];
				let stats = engine.stats();

				let stats_path = match phase.output.file_name() {
					Some(file_name) => {
						let path = self.outdir.join(file_name);
						let processor_stats = match stats.processor() {
							Some(processor_stats) => processor_stats,
							None => {
								tracing::warn!(phase_idx, "Statistics have no processor, dumping all of them");
								stats.as_value()
							},
						};
						self::write_json(&path, processor_stats)?;
						tracing::info!(phase_idx, ?path, "Dumped processor statistics");
						Some(path)
					},
					None => None,
				};

				if phase.dump_full_stats {
					let path = self.outdir.join(Self::FULL_STATS_FILE_NAME);
					self::append_full_stats(&path, stats.as_value())?;
				}

				self.report.phases.push(PhaseReport {
					phase_idx,
					start_tick,
					exit_tick: exit.tick,
					cause: exit.cause,
					stats_path,
				});

				match phase_idx + 1 < self.phases.len() {
					true => {
						engine.reset_stats();
						DriverState::Running(phase_idx + 1)
					},
					false => self.finish(console)?,
				}
			},

			DriverState::Terminal => anyhow::bail!("Staged run already finished"),
		};

		Ok(self.state)
	}

	/// Prints the final message and returns the terminal state
	fn finish(&self, console: &mut impl Write) -> Result<DriverState, anyhow::Error> {
		if let Some(final_message) = &self.final_message {
			writeln!(console, "{final_message}").context("Unable to write to console")?;
		}

		Ok(DriverState::Terminal)
	}
}

/// Writes `value` as indented json to `path`
fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), anyhow::Error> {
	let mut file = fs::File::create(path).with_context(|| format!("Unable to create stats file {path:?}"))?;
	serde_json::to_writer_pretty(&mut file, value).with_context(|| format!("Unable to write stats file {path:?}"))?;
	writeln!(file).with_context(|| format!("Unable to write stats file {path:?}"))?;

	Ok(())
}

/// Appends all statistics in `value` to `path`, one `name value` line per statistic
fn append_full_stats(path: &Path, value: &serde_json::Value) -> Result<(), anyhow::Error> {
	let mut file = fs::OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.with_context(|| format!("Unable to open stats file {path:?}"))?;

	let stats = value
		.flatten_stats("")
		.into_iter()
		.map(|(name, value)| format!("{name:<60} {value}"))
		.join("\n");

	write!(
		file,
		"\n---------- Begin Simulation Statistics ----------\n{stats}\n\n---------- End Simulation Statistics   ----------\n"
	)
	.with_context(|| format!("Unable to write stats file {path:?}"))
}
