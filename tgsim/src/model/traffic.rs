//! Generator core traffic

// Imports
use {
	crate::{
		components::{GupsConfig, TrafficConfig, TrafficPattern},
		Tick,
	},
	rand::Rng,
	std::{collections::VecDeque, ops::Range},
};

/// Memory request
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Request {
	/// Issuing core
	pub core_idx: usize,

	/// Traffic epoch the request was issued in
	pub epoch: u64,

	/// Address
	pub addr: u64,

	/// Size
	pub size: u64,

	/// Whether it's a read
	pub is_read: bool,

	/// Issue tick
	pub issued_at: Tick,
}

/// Request a core wants to issue next
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct NextRequest {
	pub addr:    u64,
	pub size:    u64,
	pub is_read: bool,
}

/// Traffic of a single core
#[derive(Clone, Debug)]
pub enum CoreTraffic {
	/// No traffic started
	Idle,

	/// Linear or random stream
	Stream(Stream),

	/// GUPS updates
	Gups(GupsCore),
}

impl CoreTraffic {
	/// Returns the next request to issue, if any
	pub fn next_request(&mut self, rng: &mut impl Rng) -> Option<NextRequest> {
		match self {
			Self::Idle => None,
			Self::Stream(stream) => stream.next_request(rng),
			Self::Gups(gups) => gups.next_request(rng),
		}
	}

	/// Handles the response to `req`.
	///
	/// Returns whether the response completed an update.
	pub fn on_response(&mut self, req: &Request) -> bool {
		match self {
			Self::Idle | Self::Stream(_) => false,
			Self::Gups(gups) => gups.on_response(req),
		}
	}

	/// Returns whether this traffic has requests left to issue
	pub fn has_work(&self) -> bool {
		match self {
			Self::Idle => false,
			Self::Stream(stream) => !stream.is_exhausted(),
			Self::Gups(gups) => !gups.is_exhausted(),
		}
	}

	/// Returns whether this traffic finishes on its own once it runs out of work
	pub fn is_limited(&self) -> bool {
		match self {
			Self::Idle => false,
			Self::Stream(stream) => stream.config.data_limit.is_some(),
			Self::Gups(_) => true,
		}
	}
}

/// Linear or random request stream
#[derive(Clone, Debug)]
pub struct Stream {
	/// Configuration
	config: TrafficConfig,

	/// Next linear address
	next_addr: u64,

	/// Bytes issued so far
	bytes_issued: u64,
}

impl Stream {
	/// Creates a new stream at the start of its address range
	pub fn new(config: TrafficConfig) -> Self {
		Self {
			next_addr: config.addr_range.start,
			bytes_issued: 0,
			config,
		}
	}

	/// Returns the ticks between two requests
	pub fn period(&self) -> Tick {
		self.config.rate.transfer_ticks(self.config.block_size)
	}

	/// Returns whether the data limit was issued
	pub fn is_exhausted(&self) -> bool {
		self.config
			.data_limit
			.is_some_and(|data_limit| self.bytes_issued >= data_limit.bytes())
	}

	fn next_request(&mut self, rng: &mut impl Rng) -> Option<NextRequest> {
		if self.is_exhausted() {
			return None;
		}

		let Range { start, end } = self.config.addr_range;
		let block_size = self.config.block_size;
		let addr = match self.config.pattern {
			TrafficPattern::Linear => {
				let addr = self.next_addr;
				self.next_addr += block_size;
				if self.next_addr + block_size > end {
					self.next_addr = start;
				}
				addr
			},
			TrafficPattern::Random => {
				let blocks = (end - start) / block_size;
				start + rng.gen_range(0..blocks) * block_size
			},
		};

		let is_read = match self.config.rd_perc {
			100 => true,
			rd_perc => rng.gen_range(0..100) < rd_perc,
		};

		self.bytes_issued += block_size;
		Some(NextRequest {
			addr,
			size: block_size,
			is_read,
		})
	}
}

/// GUPS core.
///
/// Every update reads a random table element, then writes it back once the
/// read completes.
#[derive(Clone, Debug)]
pub struct GupsCore {
	/// Table range
	range: Range<u64>,

	/// Element size
	element_size: u64,

	/// Reads left to issue
	reads_left: u64,

	/// Writes waiting to be issued
	pending_writes: VecDeque<u64>,
}

impl GupsCore {
	/// Creates the GUPS traffic of core `core_idx`
	pub fn new(config: &GupsConfig, core_idx: usize) -> Self {
		Self {
			range:          config.core_range(core_idx),
			element_size:   config.element_size,
			reads_left:     config.core_updates(core_idx),
			pending_writes: VecDeque::new(),
		}
	}

	/// Returns whether all reads and writes were issued
	pub fn is_exhausted(&self) -> bool {
		self.reads_left == 0 && self.pending_writes.is_empty()
	}

	fn next_request(&mut self, rng: &mut impl Rng) -> Option<NextRequest> {
		if let Some(addr) = self.pending_writes.pop_front() {
			return Some(NextRequest {
				addr,
				size: self.element_size,
				is_read: false,
			});
		}

		if self.reads_left == 0 {
			return None;
		}
		self.reads_left -= 1;

		let elements = (self.range.end - self.range.start) / self.element_size;
		let addr = self.range.start + rng.gen_range(0..elements) * self.element_size;
		Some(NextRequest {
			addr,
			size: self.element_size,
			is_read: true,
		})
	}

	fn on_response(&mut self, req: &Request) -> bool {
		match req.is_read {
			true => {
				self.pending_writes.push_back(req.addr);
				false
			},
			false => true,
		}
	}
}
