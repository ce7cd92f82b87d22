//! Reference model engine
//!
//! Discrete-event model of a connected board. Generator cores issue requests
//! at their configured rate, which travel through the cache hierarchy's data
//! path and, on a miss, to memory.
//!
//! Simulated time only moves forward: neither starting traffic nor resetting
//! statistics rewinds it.

// Modules
pub mod cache;
pub mod dram;
pub mod event_queue;
pub mod memory;
pub mod stats;
pub mod traffic;

// Imports
use {
	self::{
		cache::CacheModel,
		event_queue::EventQueue,
		memory::MemoryModel,
		stats::CoreStats,
		traffic::{CoreTraffic, GupsCore, Request, Stream},
	},
	crate::{
		components::{GeneratorSpec, TrafficConfig},
		ConnectedBoard,
		Engine,
		EngineConfig,
		ExitCause,
		ExitEvent,
		StatsSnapshot,
		Tick,
	},
	anyhow::Context,
	rand::{rngs::StdRng, SeedableRng},
	std::{
		collections::VecDeque,
		fmt,
		time::{Duration, Instant},
	},
	tgsim_util::SimDuration,
};

/// Events processed between checks for progress output
const PROGRESS_CHECK_EVENTS: u64 = 4096;

/// Event
#[derive(Clone, Debug)]
enum Event {
	/// Core `core_idx` may issue its next request
	Issue { core_idx: usize, epoch: u64 },

	/// Response to a request arrived at its core
	Response { req: Request },

	/// The traffic of `epoch` ran for its whole duration
	Deadline { epoch: u64 },
}

/// Generator core
#[derive(Clone, Debug)]
struct Core {
	/// Traffic
	traffic: CoreTraffic,

	/// Ticks between two requests
	period: Tick,

	/// Requests in flight
	outstanding: usize,

	/// Whether an issue event of the current epoch is scheduled
	issue_pending: bool,

	/// Statistics
	stats: CoreStats,
}

/// Reference model engine
#[derive(Debug)]
pub struct ModelEngine {
	/// Board
	board: ConnectedBoard,

	/// Traffic segments yet to start, for complex generators
	segments: VecDeque<TrafficConfig>,

	/// Cores
	cores: Vec<Core>,

	/// Caches in the data path, from the generator outwards
	caches: Vec<CacheModel>,

	/// Unused L1 instruction cache, kept for its (empty) statistics
	l1i: Option<CacheModel>,

	/// Memory
	memory: MemoryModel,

	/// Events
	events: EventQueue<Event>,

	/// Current tick
	cur_tick: Tick,

	/// Tick statistics were last reset at
	stats_reset_tick: Tick,

	/// Current traffic epoch.
	///
	/// Events of previous epochs are ignored.
	epoch: u64,

	/// Whether the current traffic is still running
	traffic_active: bool,

	/// Random number generator
	rng: StdRng,

	/// Maximum tick
	max_ticks: Option<Tick>,

	/// Maximum outstanding requests per core
	max_outstanding: usize,

	/// Progress output period
	progress_period: Duration,

	/// Events processed
	events_processed: u64,
}

impl ModelEngine {
	/// Instantiates the model of `board`
	pub fn instantiate(board: ConnectedBoard, config: &EngineConfig) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(config.max_outstanding > 0, "At least 1 outstanding request must be allowed");
		let progress_period = Duration::try_from_secs_f64(config.progress_period_secs)
			.with_context(|| format!("Invalid progress period {}", config.progress_period_secs))?;

		let cycle_ticks = board.clk_freq().period_ticks();
		let hierarchy = board.cache_hierarchy();
		let caches = hierarchy
			.data_path()
			.map(|(name, level)| {
				let num_banks = match name {
					"l2" => hierarchy.num_l2_banks,
					_ => 1,
				};
				CacheModel::new(name, *level, num_banks, cycle_ticks)
			})
			.collect::<Vec<_>>();
		let l1i = hierarchy.l1i.map(|level| CacheModel::new("l1i", level, 1, cycle_ticks));

		let segments = match board.generator() {
			GeneratorSpec::Complex(segments) => segments.iter().cloned().collect(),
			_ => VecDeque::new(),
		};
		let cores = (0..board.generator().num_cores())
			.map(|_| Core {
				traffic:       CoreTraffic::Idle,
				period:        cycle_ticks,
				outstanding:   0,
				issue_pending: false,
				stats:         CoreStats::default(),
			})
			.collect();

		tracing::debug!(
			caches = ?caches.iter().map(CacheModel::name).collect::<Vec<_>>(),
			seed = config.seed,
			"Instantiated model"
		);

		Ok(Self {
			memory: MemoryModel::new(board.memory()),
			board,
			segments,
			cores,
			caches,
			l1i,
			events: EventQueue::new(),
			cur_tick: 0,
			stats_reset_tick: 0,
			epoch: 0,
			traffic_active: false,
			rng: StdRng::seed_from_u64(config.seed),
			max_ticks: config.max_time.map(SimDuration::as_picos),
			max_outstanding: config.max_outstanding,
			progress_period,
			events_processed: 0,
		})
	}

	/// Issues the next request of core `core_idx`, if possible
	fn issue(&mut self, core_idx: usize) {
		let now = self.cur_tick;
		let core = &mut self.cores[core_idx];
		core.issue_pending = false;

		// Note: Once a response arrives, the core is woken up again
		if core.outstanding >= self.max_outstanding {
			core.stats.num_stalls += 1;
			return;
		}
		let Some(next) = core.traffic.next_request(&mut self.rng) else {
			return;
		};

		core.outstanding += 1;
		match next.is_read {
			true => {
				core.stats.num_read_reqs += 1;
				core.stats.bytes_read += next.size;
			},
			false => {
				core.stats.num_write_reqs += 1;
				core.stats.bytes_written += next.size;
			},
		}
		core.issue_pending = true;
		let next_issue = now + core.period;

		let req = Request {
			core_idx,
			epoch: self.epoch,
			addr: next.addr,
			size: next.size,
			is_read: next.is_read,
			issued_at: now,
		};
		let response_tick = self.access_memory_system(&req);
		tracing::trace!(?req, response_tick, "Issued request");

		self.events.schedule(response_tick, Event::Response { req });
		self.events.schedule(next_issue, Event::Issue {
			core_idx,
			epoch: self.epoch,
		});
	}

	/// Sends `req` through the cache hierarchy and memory.
	///
	/// Returns the tick the response reaches the core.
	fn access_memory_system(&mut self, req: &Request) -> Tick {
		let mut tick = req.issued_at;
		for level_idx in 0..self.caches.len() {
			let lookup = self.caches[level_idx].access(req.addr, !req.is_read, tick);
			tick = lookup.ready_at;
			if let Some(writeback_addr) = lookup.writeback {
				self.write_back(level_idx + 1, writeback_addr, tick);
			}

			if lookup.hit {
				return tick;
			}
		}

		// Caches fetch whole lines, even for writes
		match self.caches.last().map(CacheModel::line_size) {
			Some(line_size) => {
				let line_addr = req.addr - req.addr % line_size;
				self.memory.access(line_addr, line_size, true, tick, &mut self.rng)
			},
			None => self.memory.access(req.addr, req.size, req.is_read, tick, &mut self.rng),
		}
	}

	/// Writes back a dirty line into level `level_idx`, or memory past the last level.
	///
	/// Write backs happen off the critical path.
	fn write_back(&mut self, mut level_idx: usize, mut addr: u64, tick: Tick) {
		while let Some(cache) = self.caches.get_mut(level_idx) {
			let lookup = cache.access(addr, true, tick);
			match lookup.writeback {
				Some(writeback_addr) if !lookup.hit => addr = writeback_addr,
				_ => return,
			}
			level_idx += 1;
		}

		if let Some(line_size) = self.caches.last().map(CacheModel::line_size) {
			self.memory.access(addr, line_size, false, tick, &mut self.rng);
		}
	}

	/// Handles the response to `req`
	fn respond(&mut self, req: Request) {
		let now = self.cur_tick;
		let core = &mut self.cores[req.core_idx];
		core.outstanding = core.outstanding.saturating_sub(1);

		// Requests issued before the last reset belong to earlier statistics
		if req.issued_at >= self.stats_reset_tick {
			let latency = now - req.issued_at;
			match req.is_read {
				true => core.stats.read_latency.add(latency),
				false => core.stats.write_latency.add(latency),
			}
		}

		if req.epoch == self.epoch && core.traffic.on_response(&req) {
			core.stats.num_updates += 1;
		}

		// Wake up the core if it stalled or has new work.
		// Note: Responses from previous traffic also free up room for the current one
		if !core.issue_pending && core.traffic.has_work() {
			core.issue_pending = true;
			self.events.schedule(now, Event::Issue {
				core_idx: req.core_idx,
				epoch:    self.epoch,
			});
		}
	}

	/// Returns the exit cause if all limited traffic finished
	fn traffic_finished(&self) -> Option<ExitCause> {
		let finished = self
			.cores
			.iter()
			.all(|core| core.traffic.is_limited() && !core.traffic.has_work() && core.outstanding == 0);
		if !finished {
			return None;
		}

		match self.board.generator() {
			GeneratorSpec::Gups(_) => Some(ExitCause::UpdateLimit),
			_ => Some(ExitCause::DataLimit),
		}
	}

	/// Exits at the current tick because of `cause`
	fn exit(&mut self, cause: ExitCause) -> ExitEvent {
		self.traffic_active = false;
		ExitEvent {
			tick: self.cur_tick,
			cause,
		}
	}

	/// Formats progress output to `f`
	fn fmt_progress(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let requests = self
			.cores
			.iter()
			.map(|core| core.stats.num_read_reqs + core.stats.num_write_reqs)
			.sum::<u64>();
		let outstanding = self.cores.iter().map(|core| core.outstanding).sum::<usize>();

		write!(
			f,
			"{} simulated, {requests} requests, {outstanding} outstanding, {} events queued",
			SimDuration::from_picos(self.cur_tick),
			self.events.len()
		)
	}
}

impl Engine for ModelEngine {
	fn start_traffic(&mut self) -> Result<(), anyhow::Error> {
		let now = self.cur_tick;

		let mut duration = None;
		match self.board.generator() {
			GeneratorSpec::Traffic(config) => {
				duration = config.duration;
				let stream = Stream::new(config.clone());
				self.cores[0].period = stream.period();
				self.cores[0].traffic = CoreTraffic::Stream(stream);
			},
			GeneratorSpec::Complex(_) => {
				let config = self
					.segments
					.pop_front()
					.context("Complex generator has no traffic segments left")?;
				duration = config.duration;
				let stream = Stream::new(config);
				self.cores[0].period = stream.period();
				self.cores[0].traffic = CoreTraffic::Stream(stream);
			},
			GeneratorSpec::Gups(config) =>
				for (core_idx, core) in self.cores.iter_mut().enumerate() {
					core.traffic = CoreTraffic::Gups(GupsCore::new(config, core_idx));
				},
		}

		self.epoch += 1;
		for (core_idx, core) in self.cores.iter_mut().enumerate() {
			core.issue_pending = true;
			self.events.schedule(now, Event::Issue {
				core_idx,
				epoch: self.epoch,
			});
		}
		if let Some(duration) = duration {
			self.events.schedule(now + duration.as_picos(), Event::Deadline { epoch: self.epoch });
		}

		self.traffic_active = true;
		tracing::debug!(epoch = self.epoch, tick = now, ?duration, "Started traffic");

		Ok(())
	}

	fn simulate(&mut self) -> Result<ExitEvent, anyhow::Error> {
		// Note: We start in the past so that we output right away at the start
		let mut last_progress_time = Instant::now().checked_sub(self.progress_period).unwrap_or_else(Instant::now);

		loop {
			if self.traffic_active {
				if let Some(cause) = self.traffic_finished() {
					return Ok(self.exit(cause));
				}
			}

			let Some(next_tick) = self.events.peek_tick() else {
				let cause = match self.traffic_active {
					true => ExitCause::Fault("Event queue ran dry with traffic still active".to_owned()),
					false => ExitCause::Fault("No traffic to simulate".to_owned()),
				};
				return Ok(self.exit(cause));
			};

			// Note: The event stays queued, so a later `simulate` picks it up
			if let Some(max_ticks) = self.max_ticks {
				if next_tick > max_ticks {
					self.cur_tick = self.cur_tick.max(max_ticks);
					return Ok(self.exit(ExitCause::MaxTick));
				}
			}

			let Some((tick, event)) = self.events.pop() else {
				continue;
			};
			self.cur_tick = tick;
			self.events_processed += 1;

			match event {
				Event::Issue { core_idx, epoch } if epoch == self.epoch => self.issue(core_idx),
				Event::Issue { .. } => (),
				Event::Response { req } => self.respond(req),
				Event::Deadline { epoch } if epoch == self.epoch => return Ok(self.exit(ExitCause::DurationElapsed)),
				Event::Deadline { .. } => (),
			}

			if self.events_processed % PROGRESS_CHECK_EVENTS == 0 {
				let cur_time = Instant::now();
				if cur_time.duration_since(last_progress_time) >= self.progress_period {
					tracing::info!(
						"Progress: {}",
						tgsim_util::DisplayWrapper::new(|f| self.fmt_progress(f))
					);
					last_progress_time = cur_time;
				}
			}
		}
	}

	fn cur_tick(&self) -> Tick {
		self.cur_tick
	}

	fn stats(&self) -> StatsSnapshot {
		let sim_ticks = self.cur_tick - self.stats_reset_tick;
		let sim_seconds = SimDuration::from_picos(sim_ticks).as_secs_f64();

		let bytes_read = self.cores.iter().map(|core| core.stats.bytes_read).sum::<u64>();
		let bytes_written = self.cores.iter().map(|core| core.stats.bytes_written).sum::<u64>();
		let processor = serde_json::json!({
			"numCores": self.cores.len(),
			"bytesRead": bytes_read,
			"bytesWritten": bytes_written,
			"readBandwidth": stats::bandwidth(bytes_read, sim_ticks),
			"writeBandwidth": stats::bandwidth(bytes_written, sim_ticks),
			"cores": self.cores.iter().map(|core| &core.stats).collect::<Vec<_>>(),
		});

		let cache_hierarchy = self
			.l1i
			.iter()
			.chain(&self.caches)
			.map(|cache| {
				let stats = cache.stats();
				let value = serde_json::json!({
					"hits": stats.hits,
					"misses": stats.misses,
					"writebacks": stats.writebacks,
					"missRate": stats.miss_rate(),
				});
				(cache.name().to_owned(), value)
			})
			.collect::<serde_json::Map<_, _>>();

		let memory_stats = self.memory.stats();
		let memory = serde_json::json!({
			"numChannels": memory_stats.channels.len(),
			"bytesRead": memory_stats.bytes_read(),
			"bytesWritten": memory_stats.bytes_written(),
			"readBandwidth": stats::bandwidth(memory_stats.bytes_read(), sim_ticks),
			"writeBandwidth": stats::bandwidth(memory_stats.bytes_written(), sim_ticks),
			"numReads": memory_stats.num_reads,
			"numWrites": memory_stats.num_writes,
			"accessLatency": memory_stats.access_latency,
			"channels": memory_stats.channels,
		});

		StatsSnapshot::new(serde_json::json!({
			"simSeconds": sim_seconds,
			"simTicks": sim_ticks,
			"finalTick": self.cur_tick,
			"system": {
				"clkFreq": self.board.clk_freq().hz(),
				"processor": processor,
				"cache_hierarchy": cache_hierarchy,
				"memory": memory,
			},
		}))
	}

	fn reset_stats(&mut self) {
		for core in &mut self.cores {
			core.stats = CoreStats::default();
		}
		for cache in self.l1i.iter_mut().chain(&mut self.caches) {
			cache.reset_stats();
		}
		self.memory.reset_stats();
		self.stats_reset_tick = self.cur_tick;
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{
			components::{
				cache_factory,
				complex_generator_factory,
				generator_factory,
				gups_factory,
				memory::single_channel_memory,
				memory_factory,
				CacheClass,
				GeneratorClass,
				GupsClass,
				MemoryClass,
				TrafficPattern,
			},
			TestBoard,
		},
		tgsim_util::{Bandwidth, ByteSize, Frequency},
	};

	fn engine(generator: GeneratorSpec, cache_class: CacheClass, config: &EngineConfig) -> ModelEngine {
		let board = TestBoard::new(
			Frequency::from_hz(4_000_000_000),
			generator,
			cache_factory(cache_class),
			single_channel_memory(),
		)
		.connect_things()
		.unwrap();
		ModelEngine::instantiate(board, config).unwrap()
	}

	fn processor_u64(engine: &ModelEngine, name: &str) -> u64 {
		engine.stats().processor().unwrap()[name].as_u64().unwrap()
	}

	#[test]
	fn complex_segments_run_in_order() {
		let limits = [ByteSize::kib(32), ByteSize::kib(64)];
		let generator = complex_generator_factory(TrafficPattern::Linear, Bandwidth::from_gb_per_sec(1000.0), &limits);
		let mut engine = engine(generator, CacheClass::PrivateL1, &EngineConfig::default());

		engine.start_traffic().unwrap();
		let first = engine.simulate().unwrap();
		assert_eq!(first.cause, ExitCause::DataLimit);
		assert_eq!(processor_u64(&engine, "bytesRead"), 32 * 1024);

		// The first pass over the L1 misses every line
		let stats = engine.stats();
		let l1d = stats.component("cache_hierarchy").unwrap()["l1d"].clone();
		assert_eq!(l1d["misses"], 512);
		assert_eq!(l1d["hits"], 0);

		engine.reset_stats();
		engine.start_traffic().unwrap();
		let second = engine.simulate().unwrap();
		assert_eq!(second.cause, ExitCause::DataLimit);
		assert!(second.tick > first.tick);
		assert_eq!(processor_u64(&engine, "bytesRead"), 64 * 1024);

		// And then every line hits
		let stats = engine.stats();
		assert_eq!(stats.component("cache_hierarchy").unwrap()["l1d"]["misses"], 0);
		assert_eq!(stats.as_value()["simTicks"], second.tick - first.tick);

		assert!(engine.start_traffic().is_err());
	}

	#[test]
	fn duration_traffic_elapses() {
		let generator = generator_factory(GeneratorClass::Random, Bandwidth::from_gb_per_sec(1.0), ByteSize::mib(64));
		let mut engine = engine(generator, CacheClass::NoCache, &EngineConfig::default());

		engine.start_traffic().unwrap();
		let exit = engine.simulate().unwrap();
		assert_eq!(exit.cause, ExitCause::DurationElapsed);
		assert_eq!(exit.tick, SimDuration::from_micros(250).as_picos());

		// 1 GB/s of 64 byte requests for 250µs
		let requests = processor_u64(&engine, "bytesRead") / 64;
		let expected = 250_000_000 / Bandwidth::from_gb_per_sec(1.0).transfer_ticks(64);
		assert!(requests.abs_diff(expected) <= 1, "{requests} requests, expected {expected}");
	}

	#[test]
	fn restarted_traffic_issues_again() {
		let memory = memory_factory(MemoryClass::DDR4, 1).unwrap();
		let generator = generator_factory(
			GeneratorClass::Linear,
			Bandwidth::from_gb_per_sec(1000.0),
			memory.size(),
		);
		let board = TestBoard::new(
			Frequency::from_hz(4_000_000_000),
			generator,
			cache_factory(CacheClass::NoCache),
			memory,
		)
		.connect_things()
		.unwrap();
		let mut engine = ModelEngine::instantiate(board, &EngineConfig::default()).unwrap();

		// The first phase saturates memory, so it ends with every request slot in flight
		engine.start_traffic().unwrap();
		let first = engine.simulate().unwrap();
		assert_eq!(first.cause, ExitCause::DurationElapsed);

		engine.reset_stats();
		engine.start_traffic().unwrap();
		let second = engine.simulate().unwrap();
		assert_eq!(second.cause, ExitCause::DurationElapsed);
		assert_eq!(second.tick, 2 * first.tick);

		let stats = engine.stats();
		let core = &stats.processor().unwrap()["cores"][0];
		let num_read_reqs = core["numReadReqs"].as_u64().unwrap();
		assert!(num_read_reqs > 0);
		assert!(core["readLatency"]["count"].as_u64().unwrap() <= num_read_reqs, "{core}");
	}

	#[test]
	fn gups_reaches_update_limit() {
		let generator = gups_factory(GupsClass::GupsEp, 1000, 4).unwrap();
		let mut engine = engine(generator, CacheClass::MESITwoLevel, &EngineConfig::default());

		engine.start_traffic().unwrap();
		let exit = engine.simulate().unwrap();
		assert_eq!(exit.cause, ExitCause::UpdateLimit);

		let stats = engine.stats();
		let cores = stats.processor().unwrap()["cores"].as_array().unwrap().clone();
		assert_eq!(cores.len(), 4);
		let updates = cores.iter().map(|core| core["numUpdates"].as_u64().unwrap()).collect::<Vec<_>>();
		assert_eq!(updates, [250, 250, 250, 250]);
		assert!(cores
			.iter()
			.all(|core| core["numReadReqs"] == core["numWriteReqs"]));
	}

	#[test]
	fn max_time_stops_early() {
		let generator = generator_factory(GeneratorClass::Linear, Bandwidth::from_gb_per_sec(1.0), ByteSize::mib(1));
		let config = EngineConfig {
			max_time: Some(SimDuration::from_micros(1)),
			..EngineConfig::default()
		};
		let mut engine = engine(generator, CacheClass::NoCache, &config);

		engine.start_traffic().unwrap();
		let exit = engine.simulate().unwrap();
		assert_eq!(exit.cause, ExitCause::MaxTick);
		assert_eq!(exit.tick, 1_000_000);
		assert!(exit.cause.is_anomaly());
	}

	#[test]
	fn simulate_without_traffic_faults() {
		let generator = generator_factory(GeneratorClass::Linear, Bandwidth::from_gb_per_sec(1.0), ByteSize::mib(1));
		let mut engine = engine(generator, CacheClass::NoCache, &EngineConfig::default());

		let exit = engine.simulate().unwrap();
		assert!(matches!(exit.cause, ExitCause::Fault(_)));
		assert_eq!(exit.tick, 0);
	}

	#[test]
	fn multi_channel_memory_stats() {
		let memory = memory_factory(MemoryClass::DDR4, 2).unwrap();
		let generator = generator_factory(
			GeneratorClass::Linear,
			Bandwidth::from_gb_per_sec(48.0),
			memory.size(),
		);
		let board = TestBoard::new(
			Frequency::from_hz(4_000_000_000),
			generator,
			cache_factory(CacheClass::NoCache),
			memory,
		)
		.connect_things()
		.unwrap();
		let mut engine = ModelEngine::instantiate(board, &EngineConfig::default()).unwrap();

		engine.start_traffic().unwrap();
		engine.simulate().unwrap();

		let stats = engine.stats();
		let memory = stats.component("memory").unwrap();
		let channels = memory["channels"].as_array().unwrap();
		assert_eq!(channels.len(), 2);
		assert!(channels.iter().all(|channel| channel["bytesRead"].as_u64().unwrap() > 0));
		assert!(memory["numReads"].as_u64().unwrap() > 0);
	}
}
