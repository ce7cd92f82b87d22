//! DRAM model
//!
//! Coarse channel model. Requests are split into bursts, each burst is
//! mapped onto its channel, pays a fixed `tRCD + tCL` access latency and then
//! occupies the channel's data bus for `tBURST`. Banks and rows aren't modeled.

// Imports
use {
	super::stats::MemoryStats,
	crate::{components::memory::MultiChannelMemory, Tick},
	tgsim_util::SimDuration,
};

/// Latency between a request arriving at the controller and being sent to the device
pub const FRONTEND_LATENCY: SimDuration = SimDuration::from_nanos(10);

/// Latency between the data leaving the bus and the response leaving the controller
pub const BACKEND_LATENCY: SimDuration = SimDuration::from_nanos(10);

/// Multi-channel DRAM model
#[derive(Clone, Debug)]
pub struct DramModel {
	/// Memory
	memory: MultiChannelMemory,

	/// Tick each channel's data bus is free at
	bus_free: Vec<Tick>,
}

impl DramModel {
	/// Creates a model with every channel idle
	pub fn new(memory: MultiChannelMemory) -> Self {
		Self {
			bus_free: vec![0; memory.num_channels],
			memory,
		}
	}

	/// Returns the number of channels
	pub fn num_channels(&self) -> usize {
		self.bus_free.len()
	}

	/// Accesses `size` bytes at `addr`, arriving at `now`.
	///
	/// Returns the tick the response leaves the controller.
	pub fn access(&mut self, addr: u64, size: u64, is_read: bool, now: Tick, stats: &mut MemoryStats) -> Tick {
		let interface = self.memory.interface;
		let burst_size = interface.burst_size;
		let access_latency = (interface.t_rcd + interface.t_cl).as_picos();
		let t_burst = interface.t_burst.as_picos();

		let data_ready = now + FRONTEND_LATENCY.as_picos() + access_latency;
		let end_addr = addr + size.max(1);
		let mut done = data_ready;
		for burst_idx in addr / burst_size..=(end_addr - 1) / burst_size {
			let burst_addr = burst_idx * burst_size;
			let channel = self.memory.locate(burst_addr).channel;

			let bus_free = &mut self.bus_free[channel];
			let transfer_start = data_ready.max(*bus_free);
			*bus_free = transfer_start + t_burst;
			done = done.max(*bus_free);

			let channel_stats = &mut stats.channels[channel];
			let bytes = end_addr.min(burst_addr + burst_size) - addr.max(burst_addr);
			channel_stats.num_bursts += 1;
			match is_read {
				true => channel_stats.bytes_read += bytes,
				false => channel_stats.bytes_written += bytes,
			}
		}

		done + BACKEND_LATENCY.as_picos()
	}
}
