//! Statistics
//!
//! Counters kept by the model's components. Every counter is in ticks or
//! bytes, and serializes with `camelCase` names.

// Imports
use {crate::Tick, average::Estimate};

/// Latency distribution
#[derive(Clone, Debug)]
pub struct Latency {
	/// Mean and variance
	variance: average::Variance,

	/// Minimum
	min: Option<Tick>,

	/// Maximum
	max: Option<Tick>,
}

impl Latency {
	/// Adds a sample
	pub fn add(&mut self, ticks: Tick) {
		self.variance.add(ticks as f64);
		self.min = Some(self.min.map_or(ticks, |min| min.min(ticks)));
		self.max = Some(self.max.map_or(ticks, |max| max.max(ticks)));
	}

	/// Returns the number of samples
	pub fn count(&self) -> u64 {
		self.variance.len()
	}

	/// Returns the mean, or `0` without samples
	pub fn mean(&self) -> f64 {
		match self.count() {
			0 => 0.0,
			_ => self.variance.mean(),
		}
	}

	/// Returns the sample standard deviation, or `0` with less than 2 samples
	pub fn stdev(&self) -> f64 {
		match self.count() {
			0 | 1 => 0.0,
			_ => self.variance.sample_variance().sqrt(),
		}
	}
}

impl Default for Latency {
	fn default() -> Self {
		Self {
			variance: average::Variance::new(),
			min:      None,
			max:      None,
		}
	}
}

impl serde::Serialize for Latency {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		#[derive(serde::Serialize)]
		#[serde(rename_all = "camelCase")]
		struct Summary {
			count:       u64,
			mean_ticks:  f64,
			stdev_ticks: f64,
			min_ticks:   Tick,
			max_ticks:   Tick,
		}

		Summary {
			count:       self.count(),
			mean_ticks:  self.mean(),
			stdev_ticks: self.stdev(),
			min_ticks:   self.min.unwrap_or(0),
			max_ticks:   self.max.unwrap_or(0),
		}
		.serialize(serializer)
	}
}

/// Generator core statistics
#[derive(Clone, Default, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreStats {
	/// Read requests issued
	pub num_read_reqs: u64,

	/// Write requests issued
	pub num_write_reqs: u64,

	/// Bytes requested by reads
	pub bytes_read: u64,

	/// Bytes requested by writes
	pub bytes_written: u64,

	/// Completed read-modify-write updates
	pub num_updates: u64,

	/// Times the core couldn't issue due to too many outstanding requests
	pub num_stalls: u64,

	/// Read latency
	pub read_latency: Latency,

	/// Write latency
	pub write_latency: Latency,
}

/// Cache level statistics
#[derive(Clone, Default, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
	pub hits:       u64,
	pub misses:     u64,
	pub writebacks: u64,
}

impl CacheStats {
	/// Returns the miss rate, or `0` without accesses
	pub fn miss_rate(&self) -> f64 {
		match self.hits + self.misses {
			0 => 0.0,
			accesses => self.misses as f64 / accesses as f64,
		}
	}
}

/// Memory channel statistics
#[derive(Clone, Default, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
	pub num_bursts:    u64,
	pub bytes_read:    u64,
	pub bytes_written: u64,
}

/// Memory statistics
#[derive(Clone, Default, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
	/// Read accesses
	pub num_reads: u64,

	/// Write accesses
	pub num_writes: u64,

	/// Access latency, from arrival until the data is transferred
	pub access_latency: Latency,

	/// Per-channel statistics
	pub channels: Vec<ChannelStats>,
}

impl MemoryStats {
	/// Creates empty statistics for `num_channels` channels
	pub fn new(num_channels: usize) -> Self {
		Self {
			channels: vec![ChannelStats::default(); num_channels],
			..Self::default()
		}
	}

	/// Returns the total bytes read
	pub fn bytes_read(&self) -> u64 {
		self.channels.iter().map(|channel| channel.bytes_read).sum()
	}

	/// Returns the total bytes written
	pub fn bytes_written(&self) -> u64 {
		self.channels.iter().map(|channel| channel.bytes_written).sum()
	}
}

/// Returns the bandwidth of transferring `bytes` over `ticks`, in bytes per second
pub fn bandwidth(bytes: u64, ticks: Tick) -> f64 {
	match ticks {
		0 => 0.0,
		_ => bytes as f64 / tgsim_util::SimDuration::from_picos(ticks).as_secs_f64(),
	}
}
