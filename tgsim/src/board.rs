//! Test board
//!
//! Wires a generator, a cache hierarchy and a memory together.
//! Wiring consumes the [`TestBoard`], so a connected board can't be re-wired.

// Imports
use {
	crate::{
		components::{CacheHierarchy, GeneratorSpec, MemorySpec},
		ConfigError,
	},
	tgsim_util::Frequency,
};

/// Unconnected test board
#[derive(Clone, Debug)]
pub struct TestBoard {
	/// Clock frequency
	clk_freq: Frequency,

	/// Traffic generator, in place of a processor
	generator: GeneratorSpec,

	/// Cache hierarchy
	cache_hierarchy: CacheHierarchy,

	/// Memory
	memory: MemorySpec,
}

impl TestBoard {
	/// Creates a new, unconnected, board
	pub fn new(
		clk_freq: Frequency,
		generator: GeneratorSpec,
		cache_hierarchy: CacheHierarchy,
		memory: MemorySpec,
	) -> Self {
		Self {
			clk_freq,
			generator,
			cache_hierarchy,
			memory,
		}
	}

	/// Connects all components.
	///
	/// # Errors
	/// Returns an error if the components can't work together.
	pub fn connect_things(self) -> Result<ConnectedBoard, ConfigError> {
		let topology_err = |msg: String| Err(ConfigError::Topology(msg));

		if self.clk_freq.period_ticks() == 0 {
			return topology_err(format!("Clock frequency {} is out of range", self.clk_freq));
		}

		// Check the generator
		for config in self.generator.traffic_configs() {
			if !config.is_bounded() {
				return topology_err("Traffic has neither a duration nor a data limit".to_owned());
			}
			if !config.block_size.is_power_of_two() {
				return topology_err(format!("Block size {} isn't a power of two", config.block_size));
			}
			if config.addr_range.end < config.addr_range.start + config.block_size {
				return topology_err(format!(
					"Address range {:#x}..{:#x} is smaller than a block",
					config.addr_range.start, config.addr_range.end
				));
			}
			if config.rd_perc > 100 {
				return topology_err(format!("Read percentage {} is above 100", config.rd_perc));
			}
			if config.rate.bytes_per_sec() <= 0.0 {
				return topology_err(format!("Rate {} isn't positive", config.rate));
			}
		}
		if let GeneratorSpec::Complex(segments) = &self.generator {
			if segments.is_empty() {
				return topology_err("Complex generator has no segments".to_owned());
			}
		}

		// Check the caches
		for (name, level) in self.cache_hierarchy.levels() {
			if level.num_sets() == 0 {
				return topology_err(format!("Cache {name} ({}, {}-way) has no whole sets", level.size, level.assoc));
			}
		}
		if self.cache_hierarchy.l2.is_some() && self.cache_hierarchy.num_l2_banks == 0 {
			return topology_err("L2 cache has no banks".to_owned());
		}
		if let Some(line_size) = self.cache_hierarchy.line_size() {
			let request_size = self.generator.max_request_size();
			if request_size > line_size {
				return topology_err(format!(
					"Requests of {request_size} bytes don't fit in a {line_size} byte cache line"
				));
			}
		}

		// And that the generator stays inside memory
		let addr_span = self.generator.addr_span();
		let mem_size = self.memory.size();
		if addr_span.end > mem_size.bytes() {
			return topology_err(format!(
				"Generator addresses up to {:#x} exceed the {mem_size} memory",
				addr_span.end
			));
		}

		tracing::debug!(
			clk_freq = %self.clk_freq,
			cores = self.generator.num_cores(),
			cache_class = %self.cache_hierarchy.class,
			channels = self.memory.num_channels(),
			%mem_size,
			"Connected board"
		);

		Ok(ConnectedBoard {
			clk_freq:        self.clk_freq,
			generator:       self.generator,
			cache_hierarchy: self.cache_hierarchy,
			memory:          self.memory,
		})
	}
}

/// Connected test board
#[derive(Clone, Debug)]
pub struct ConnectedBoard {
	clk_freq:        Frequency,
	generator:       GeneratorSpec,
	cache_hierarchy: CacheHierarchy,
	memory:          MemorySpec,
}

impl ConnectedBoard {
	/// Returns the clock frequency
	pub fn clk_freq(&self) -> Frequency {
		self.clk_freq
	}

	/// Returns the generator
	pub fn generator(&self) -> &GeneratorSpec {
		&self.generator
	}

	/// Returns the cache hierarchy
	pub fn cache_hierarchy(&self) -> &CacheHierarchy {
		&self.cache_hierarchy
	}

	/// Returns the memory
	pub fn memory(&self) -> &MemorySpec {
		&self.memory
	}
}
