//! Cache model
//!
//! Set-associative, write-back and write-allocate caches with LRU
//! replacement. Lines are filled as soon as they're looked up.

// Imports
use {
	super::stats::CacheStats,
	crate::{components::CacheLevel, Tick},
};

/// Cache line
#[derive(Clone, Copy, Debug)]
struct Line {
	/// Tag
	tag: u64,

	/// Whether the line was written to
	dirty: bool,

	/// Last use, for LRU
	last_use: u64,
}

/// Lookup result
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Lookup {
	/// Whether the line was present
	pub hit: bool,

	/// Tick the lookup finished at
	pub ready_at: Tick,

	/// Address of an evicted dirty line
	pub writeback: Option<u64>,
}

/// Cache model of a single level
#[derive(Clone, Debug)]
pub struct CacheModel {
	/// Level name
	name: &'static str,

	/// Geometry
	level: CacheLevel,

	/// Number of sets
	num_sets: u64,

	/// Sets, each with up to `level.assoc` lines
	sets: Vec<Vec<Line>>,

	/// Tick each bank is busy until
	banks: Vec<Tick>,

	/// Hit latency
	hit_ticks: Tick,

	/// Bank occupancy per access
	cycle_ticks: Tick,

	/// Use counter, for LRU
	use_counter: u64,

	/// Statistics
	stats: CacheStats,
}

impl CacheModel {
	/// Creates an empty cache with `num_banks` banks, clocked every `cycle_ticks`
	pub fn new(name: &'static str, level: CacheLevel, num_banks: usize, cycle_ticks: Tick) -> Self {
		let num_sets = level.num_sets();
		Self {
			name,
			level,
			num_sets,
			sets: vec![Vec::with_capacity(level.assoc as usize); num_sets as usize],
			banks: vec![0; num_banks.max(1)],
			hit_ticks: level.hit_cycles * cycle_ticks,
			cycle_ticks,
			use_counter: 0,
			stats: CacheStats::default(),
		}
	}

	/// Returns the level name
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Returns the line size
	pub fn line_size(&self) -> u64 {
		self.level.line_size
	}

	/// Returns the statistics
	pub fn stats(&self) -> &CacheStats {
		&self.stats
	}

	/// Resets the statistics, keeping the contents
	pub fn reset_stats(&mut self) {
		self.stats = CacheStats::default();
	}

	/// Looks up the line of `addr` at `now`, allocating it on a miss
	pub fn access(&mut self, addr: u64, is_write: bool, now: Tick) -> Lookup {
		let line_addr = addr / self.level.line_size;
		let set_idx = (line_addr % self.num_sets) as usize;
		let tag = line_addr / self.num_sets;

		// Banks are pipelined, each accepts a lookup every cycle
		let bank_idx = (line_addr % self.banks.len() as u64) as usize;
		let bank = &mut self.banks[bank_idx];
		let start = now.max(*bank);
		*bank = start + self.cycle_ticks;
		let ready_at = start + self.hit_ticks;

		self.use_counter += 1;
		let last_use = self.use_counter;
		let set = &mut self.sets[set_idx];
		if let Some(line) = set.iter_mut().find(|line| line.tag == tag) {
			line.last_use = last_use;
			line.dirty |= is_write;
			self.stats.hits += 1;
			return Lookup {
				hit: true,
				ready_at,
				writeback: None,
			};
		}

		self.stats.misses += 1;
		let new_line = Line {
			tag,
			dirty: is_write,
			last_use,
		};
		let evicted = match set.len() < self.level.assoc as usize {
			true => {
				set.push(new_line);
				None
			},
			false => set
				.iter_mut()
				.min_by_key(|line| line.last_use)
				.map(|victim| std::mem::replace(victim, new_line)),
		};

		let writeback = evicted.filter(|victim| victim.dirty).map(|victim| {
			self.stats.writebacks += 1;
			(victim.tag * self.num_sets + set_idx as u64) * self.level.line_size
		});

		Lookup {
			hit: false,
			ready_at,
			writeback,
		}
	}
}

#[cfg(test)]
mod tests {
	use {super::*, tgsim_util::ByteSize};

	/// 2 sets of 2 ways
	fn small_cache() -> CacheModel {
		CacheModel::new("l1d", CacheLevel::new(ByteSize(256), 2, 2), 1, 250)
	}

	#[test]
	fn miss_then_hit() {
		let mut cache = small_cache();

		let miss = cache.access(0x40, false, 0);
		assert!(!miss.hit);
		assert_eq!(miss.ready_at, 500);

		let hit = cache.access(0x48, false, 1000);
		assert!(hit.hit);
		assert_eq!(hit.ready_at, 1500);
		assert_eq!((cache.stats().hits, cache.stats().misses), (1, 1));
	}

	#[test]
	fn evicts_least_recently_used() {
		let mut cache = small_cache();

		// Lines 0, 2 and 4 all map to set 0
		cache.access(0, false, 0);
		cache.access(128, false, 0);
		cache.access(0, false, 0);
		cache.access(256, false, 0);

		assert!(cache.access(0, false, 0).hit);
		assert!(!cache.access(128, false, 0).hit);
	}

	#[test]
	fn dirty_victims_are_written_back() {
		let mut cache = small_cache();

		cache.access(0, true, 0);
		cache.access(128, false, 0);
		let lookup = cache.access(256, false, 0);
		assert_eq!(lookup.writeback, Some(0));
		assert_eq!(cache.stats().writebacks, 1);

		// Clean victims aren't
		let lookup = cache.access(384, false, 0);
		assert_eq!(lookup.writeback, None);
	}

	#[test]
	fn bank_serializes_same_cycle_lookups() {
		let mut cache = small_cache();
		let first = cache.access(0, false, 0);
		let second = cache.access(64, false, 0);
		assert_eq!(second.ready_at, first.ready_at + 250);

		cache.reset_stats();
		assert_eq!(cache.stats().misses, 0);
		assert!(cache.access(0, false, 10_000).hit);
	}
}
