//! Event queue

// Imports
use {
	crate::Tick,
	std::{cmp, collections::BinaryHeap},
};

/// Event queue.
///
/// Pops events by earliest tick. Events on the same tick pop in insertion order.
#[derive(Debug)]
pub struct EventQueue<E> {
	/// Events
	heap: BinaryHeap<Scheduled<E>>,

	/// Next insertion index
	next_seq: u64,
}

impl<E> EventQueue<E> {
	/// Creates an empty event queue
	pub fn new() -> Self {
		Self {
			heap:     BinaryHeap::new(),
			next_seq: 0,
		}
	}

	/// Schedules `event` on `tick`
	pub fn schedule(&mut self, tick: Tick, event: E) {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.heap.push(Scheduled { tick, seq, event });
	}

	/// Returns the tick of the earliest event
	pub fn peek_tick(&self) -> Option<Tick> {
		self.heap.peek().map(|scheduled| scheduled.tick)
	}

	/// Pops the earliest event
	pub fn pop(&mut self) -> Option<(Tick, E)> {
		self.heap.pop().map(|scheduled| (scheduled.tick, scheduled.event))
	}

	/// Returns the number of scheduled events
	pub fn len(&self) -> usize {
		self.heap.len()
	}
}

/// Scheduled event
#[derive(Debug)]
struct Scheduled<E> {
	tick:  Tick,
	seq:   u64,
	event: E,
}

impl<E> PartialEq for Scheduled<E> {
	fn eq(&self, other: &Self) -> bool {
		(self.tick, self.seq) == (other.tick, other.seq)
	}
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl<E> Ord for Scheduled<E> {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		// Note: Reversed, `BinaryHeap` is a max-heap
		(other.tick, other.seq).cmp(&(self.tick, self.seq))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pops_by_tick_then_insertion() {
		let mut queue = EventQueue::new();
		queue.schedule(30, "c");
		queue.schedule(10, "a");
		queue.schedule(20, "b1");
		queue.schedule(20, "b2");

		assert_eq!(queue.len(), 4);
		assert_eq!(queue.peek_tick(), Some(10));
		let events = std::iter::from_fn(|| queue.pop()).collect::<Vec<_>>();
		assert_eq!(events, [(10, "a"), (20, "b1"), (20, "b2"), (30, "c")]);
		assert_eq!(queue.peek_tick(), None);
	}
}
