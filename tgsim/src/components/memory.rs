//! Memories

// Imports
use {
	crate::ConfigError,
	tgsim_util::{Bandwidth, ByteSize, SimDuration},
};

/// Memory selector
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
#[value(rename_all = "verbatim")]
pub enum MemoryClass {
	DDR3,
	DDR4,
	LPDDR3,
	LPDDR5,
	HBM,
}
impl_selector!(MemoryClass, "memory class");

impl MemoryClass {
	/// Returns the DRAM interface of this memory class
	#[must_use]
	pub const fn interface(self) -> DramInterface {
		match self {
			Self::DDR3 => DramInterface::DDR3_1600_8X8,
			Self::DDR4 => DramInterface::DDR4_2400_8X8,
			Self::LPDDR3 => DramInterface::LPDDR3_1600_1X32,
			Self::LPDDR5 => DramInterface::LPDDR5_5500_1X16_8B_BL32,
			Self::HBM => DramInterface::HBM_1000_4H_1X128,
		}
	}
}

/// DRAM device family, as seen by a single channel
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DramInterface {
	/// Device name
	pub name: &'static str,

	/// Bytes transferred per burst
	pub burst_size: u64,

	/// Burst duration on the data bus
	pub t_burst: SimDuration,

	/// CAS latency
	pub t_cl: SimDuration,

	/// Row to column delay
	pub t_rcd: SimDuration,

	/// Row precharge time
	pub t_rp: SimDuration,

	/// Banks per rank
	pub banks_per_rank: u64,

	/// Ranks per channel
	pub ranks_per_channel: u64,

	/// Row buffer size, per rank
	pub row_buffer_size: u64,

	/// Capacity of one channel
	pub channel_size: ByteSize,
}

impl DramInterface {
	pub const DDR3_1600_8X8: Self = Self {
		name:              "DDR3_1600_8x8",
		burst_size:        64,
		t_burst:           SimDuration::from_picos(5_000),
		t_cl:              SimDuration::from_picos(13_750),
		t_rcd:             SimDuration::from_picos(13_750),
		t_rp:              SimDuration::from_picos(13_750),
		banks_per_rank:    8,
		ranks_per_channel: 2,
		row_buffer_size:   8192,
		channel_size:      ByteSize::gib(8),
	};
	pub const DDR4_2400_8X8: Self = Self {
		name:              "DDR4_2400_8x8",
		burst_size:        64,
		t_burst:           SimDuration::from_picos(3_332),
		t_cl:              SimDuration::from_picos(14_160),
		t_rcd:             SimDuration::from_picos(14_160),
		t_rp:              SimDuration::from_picos(14_160),
		banks_per_rank:    16,
		ranks_per_channel: 2,
		row_buffer_size:   8192,
		channel_size:      ByteSize::gib(16),
	};
	pub const HBM_1000_4H_1X128: Self = Self {
		name:              "HBM_1000_4H_1x128",
		burst_size:        64,
		t_burst:           SimDuration::from_picos(4_000),
		t_cl:              SimDuration::from_picos(7_000),
		t_rcd:             SimDuration::from_picos(7_000),
		t_rp:              SimDuration::from_picos(7_000),
		banks_per_rank:    16,
		ranks_per_channel: 2,
		row_buffer_size:   2048,
		channel_size:      ByteSize::mib(512),
	};
	pub const LPDDR3_1600_1X32: Self = Self {
		name:              "LPDDR3_1600_1x32",
		burst_size:        32,
		t_burst:           SimDuration::from_picos(5_000),
		t_cl:              SimDuration::from_picos(15_000),
		t_rcd:             SimDuration::from_picos(18_000),
		t_rp:              SimDuration::from_picos(18_000),
		banks_per_rank:    8,
		ranks_per_channel: 1,
		row_buffer_size:   1024,
		channel_size:      ByteSize::mib(512),
	};
	pub const LPDDR5_5500_1X16_8B_BL32: Self = Self {
		name:              "LPDDR5_5500_1x16_8B_BL32",
		burst_size:        64,
		t_burst:           SimDuration::from_picos(5_818),
		t_cl:              SimDuration::from_picos(15_000),
		t_rcd:             SimDuration::from_picos(15_000),
		t_rp:              SimDuration::from_picos(15_000),
		banks_per_rank:    16,
		ranks_per_channel: 1,
		row_buffer_size:   2048,
		channel_size:      ByteSize::gib(1),
	};

	/// Returns the number of bursts in a row
	#[must_use]
	pub const fn bursts_per_row(&self) -> u64 {
		self.row_buffer_size / self.burst_size
	}
}

/// Address mapping, from most to least significant field.
///
/// `Ro`: row, `Co`: column, `Ra`: rank, `Ba`: bank, `Ch`: channel.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AddrMapping {
	RoCoRaBaCh,
	RoRaBaCoCh,
}

/// Location of a burst inside a channel
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DramCoord {
	pub rank:   u64,
	pub bank:   u64,
	pub row:    u64,
	pub column: u64,
}

/// Location of a burst in a multi-channel memory
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct BurstLocation {
	/// Channel index
	pub channel: usize,

	/// Location inside the channel
	pub coord: DramCoord,
}

/// Multi-channel DRAM memory
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MultiChannelMemory {
	/// Device family of every channel
	pub interface: DramInterface,

	/// Number of channels
	pub num_channels: usize,

	/// Address mapping
	pub addr_mapping: AddrMapping,

	/// Channel interleaving granularity
	pub interleaving_size: u64,

	/// Total size
	pub size: ByteSize,
}

impl MultiChannelMemory {
	/// Creates a memory of `num_channels` `interface` channels, sized by the channels' capacity
	#[must_use]
	pub fn new(interface: DramInterface, num_channels: usize, addr_mapping: AddrMapping) -> Self {
		Self {
			interface,
			num_channels,
			addr_mapping,
			interleaving_size: interface.burst_size,
			size: ByteSize(interface.channel_size.bytes() * num_channels as u64),
		}
	}

	/// Locates the burst containing `addr`.
	///
	/// Consecutive `interleaving_size` blocks go to consecutive channels, then the
	/// channel-local address is split into fields following the address mapping.
	#[must_use]
	pub fn locate(&self, addr: u64) -> BurstLocation {
		let num_channels = self.num_channels.max(1) as u64;
		let block = addr / self.interleaving_size;
		let channel = block % num_channels;
		let local_addr = (block / num_channels) * self.interleaving_size + addr % self.interleaving_size;

		let interface = &self.interface;
		let mut rest = local_addr / interface.burst_size;
		let mut take = |radix: u64| {
			let field = rest % radix;
			rest /= radix;
			field
		};

		let (rank, bank, column) = match self.addr_mapping {
			AddrMapping::RoCoRaBaCh => {
				let bank = take(interface.banks_per_rank);
				let rank = take(interface.ranks_per_channel);
				let column = take(interface.bursts_per_row());
				(rank, bank, column)
			},
			AddrMapping::RoRaBaCoCh => {
				let column = take(interface.bursts_per_row());
				let bank = take(interface.banks_per_rank);
				let rank = take(interface.ranks_per_channel);
				(rank, bank, column)
			},
		};

		BurstLocation {
			channel: channel as usize,
			coord:   DramCoord {
				rank,
				bank,
				row: rest,
				column,
			},
		}
	}
}

/// Simple single-channel memory with a fixed latency and bandwidth
#[derive(PartialEq, Clone, Debug)]
pub struct SimpleMemory {
	/// Access latency
	pub latency: SimDuration,

	/// Maximum extra latency, drawn uniformly per access
	pub latency_var: SimDuration,

	/// Bandwidth
	pub bandwidth: Bandwidth,

	/// Size
	pub size: ByteSize,
}

/// Memory specification
#[derive(PartialEq, Clone, Debug)]
pub enum MemorySpec {
	MultiChannel(MultiChannelMemory),
	SingleChannel(SimpleMemory),
}

impl MemorySpec {
	/// Returns the size of this memory
	#[must_use]
	pub fn size(&self) -> ByteSize {
		match self {
			Self::MultiChannel(memory) => memory.size,
			Self::SingleChannel(memory) => memory.size,
		}
	}

	/// Returns the number of channels
	#[must_use]
	pub fn num_channels(&self) -> usize {
		match self {
			Self::MultiChannel(memory) => memory.num_channels,
			Self::SingleChannel(_) => 1,
		}
	}
}

/// Maximum number of channels
pub const MAX_CHANNELS: usize = 64;

/// Creates a `num_channels` channel memory of the `class` family
pub fn memory_factory(class: MemoryClass, num_channels: usize) -> Result<MemorySpec, ConfigError> {
	if !(1..=MAX_CHANNELS).contains(&num_channels) {
		return Err(ConfigError::InvalidValue {
			what:   "channel count",
			value:  num_channels.to_string(),
			reason: format!("must be between 1 and {MAX_CHANNELS}"),
		});
	}

	Ok(MemorySpec::MultiChannel(MultiChannelMemory::new(
		class.interface(),
		num_channels,
		AddrMapping::RoCoRaBaCh,
	)))
}

/// Creates the simple single-channel memory: 60ns latency, no variance, 1000 GB/s.
#[must_use]
pub fn single_channel_memory() -> MemorySpec {
	MemorySpec::SingleChannel(SimpleMemory {
		latency:     SimDuration::from_nanos(60),
		latency_var: SimDuration::ZERO,
		bandwidth:   Bandwidth::from_gb_per_sec(1000.0),
		size:        ByteSize::gib(1),
	})
}
