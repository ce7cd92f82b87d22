//! Memory model

// Imports
use {
	super::{dram::DramModel, stats::MemoryStats},
	crate::{
		components::{memory::SimpleMemory, MemorySpec},
		Tick,
	},
	rand::Rng,
	tgsim_util::Bandwidth,
};

/// Memory model
#[derive(Clone, Debug)]
pub struct MemoryModel {
	backend: Backend,
	stats:   MemoryStats,
}

#[derive(Clone, Debug)]
enum Backend {
	Dram(DramModel),
	Simple(SimpleMemoryModel),
}

impl MemoryModel {
	/// Creates an idle memory
	pub fn new(spec: &MemorySpec) -> Self {
		let backend = match spec {
			MemorySpec::MultiChannel(memory) => Backend::Dram(DramModel::new(memory.clone())),
			MemorySpec::SingleChannel(memory) => Backend::Simple(SimpleMemoryModel::new(memory)),
		};

		Self {
			stats: MemoryStats::new(spec.num_channels()),
			backend,
		}
	}

	/// Accesses `size` bytes at `addr`, arriving at `now`.
	///
	/// Returns the tick the response is ready at.
	pub fn access(&mut self, addr: u64, size: u64, is_read: bool, now: Tick, rng: &mut impl Rng) -> Tick {
		let done = match &mut self.backend {
			Backend::Dram(dram) => dram.access(addr, size, is_read, now, &mut self.stats),
			Backend::Simple(simple) => {
				let channel_stats = &mut self.stats.channels[0];
				channel_stats.num_bursts += 1;
				match is_read {
					true => channel_stats.bytes_read += size,
					false => channel_stats.bytes_written += size,
				}
				simple.access(size, now, rng)
			},
		};

		match is_read {
			true => self.stats.num_reads += 1,
			false => self.stats.num_writes += 1,
		}
		self.stats.access_latency.add(done - now);

		done
	}

	/// Returns the statistics
	pub fn stats(&self) -> &MemoryStats {
		&self.stats
	}

	/// Resets the statistics, keeping all bus state
	pub fn reset_stats(&mut self) {
		self.stats = MemoryStats::new(self.stats.channels.len());
	}
}

/// Fixed latency memory, serialized by its bandwidth
#[derive(Clone, Debug)]
struct SimpleMemoryModel {
	latency:     Tick,
	latency_var: Tick,
	bandwidth:   Bandwidth,
	busy_until:  Tick,
}

impl SimpleMemoryModel {
	fn new(memory: &SimpleMemory) -> Self {
		Self {
			latency:     memory.latency.as_picos(),
			latency_var: memory.latency_var.as_picos(),
			bandwidth:   memory.bandwidth,
			busy_until:  0,
		}
	}

	fn access(&mut self, size: u64, now: Tick, rng: &mut impl Rng) -> Tick {
		let start = now.max(self.busy_until);
		let transfer = self.bandwidth.transfer_ticks(size);
		self.busy_until = start + transfer;

		let variance = match self.latency_var {
			0 => 0,
			latency_var => rng.gen_range(0..=latency_var),
		};
		self.busy_until + self.latency + variance
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::components::{memory::single_channel_memory, memory_factory, MemoryClass},
		rand::{rngs::StdRng, SeedableRng},
		tgsim_util::SimDuration,
	};

	#[test]
	fn simple_memory_latency_and_bandwidth() {
		let mut memory = MemoryModel::new(&single_channel_memory());
		let mut rng = StdRng::seed_from_u64(0);

		// 64 bytes at 1000 GB/s take 60 ticks
		let first = memory.access(0, 64, true, 0, &mut rng);
		assert_eq!(first, 60 + SimDuration::from_nanos(60).as_picos());

		// Back to back requests queue on the bandwidth
		let second = memory.access(64, 64, false, 0, &mut rng);
		assert_eq!(second, first + 60);

		let stats = memory.stats();
		assert_eq!((stats.num_reads, stats.num_writes), (1, 1));
		assert_eq!((stats.bytes_read(), stats.bytes_written()), (64, 64));
		assert_eq!(stats.access_latency.count(), 2);
	}

	#[test]
	fn latency_variance_is_bounded() {
		let mut memory = SimpleMemoryModel::new(&SimpleMemory {
			latency:     SimDuration::from_nanos(10),
			latency_var: SimDuration::from_nanos(5),
			bandwidth:   Bandwidth::from_gb_per_sec(1000.0),
			size:        tgsim_util::ByteSize::gib(1),
		});
		let mut rng = StdRng::seed_from_u64(1);

		for idx in 0..100 {
			let now = idx * 1_000_000;
			let latency = memory.access(64, now, &mut rng) - now;
			assert!((10_060..=15_060).contains(&latency), "Latency {latency} out of bounds");
		}
	}

	#[test]
	fn reset_keeps_channels() {
		let mut memory = MemoryModel::new(&memory_factory(MemoryClass::HBM, 4).unwrap());
		let mut rng = StdRng::seed_from_u64(0);
		memory.access(0, 64, true, 0, &mut rng);
		assert_eq!(memory.stats().num_reads, 1);

		memory.reset_stats();
		assert_eq!(memory.stats().num_reads, 0);
		assert_eq!(memory.stats().channels.len(), 4);
	}
}
