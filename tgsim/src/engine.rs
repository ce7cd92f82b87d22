//! Engine

// Imports
use std::fmt;

/// Simulated time, in pico-seconds
pub type Tick = u64;

/// Simulation engine.
///
/// Owns an instantiated board and advances it in simulated time.
pub trait Engine {
	/// Starts the generator's next traffic.
	///
	/// Generators with a single traffic configuration restart it, while
	/// generators with multiple segments move onto the next segment.
	fn start_traffic(&mut self) -> Result<(), anyhow::Error>;

	/// Simulates until the next exit event
	fn simulate(&mut self) -> Result<ExitEvent, anyhow::Error>;

	/// Returns the current tick
	fn cur_tick(&self) -> Tick;

	/// Returns a snapshot of all statistics since the last reset
	fn stats(&self) -> StatsSnapshot;

	/// Resets all statistics.
	///
	/// Simulated time and component state are kept.
	fn reset_stats(&mut self);
}

/// Exit event
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ExitEvent {
	/// Tick of the exit
	pub tick: Tick,

	/// Cause
	pub cause: ExitCause,
}

/// Exit cause
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ExitCause {
	/// Traffic requested its data limit and all responses arrived
	DataLimit,

	/// Traffic duration elapsed
	DurationElapsed,

	/// All updates were performed
	UpdateLimit,

	/// Maximum tick reached
	MaxTick,

	/// Engine fault
	Fault(String),
}

impl ExitCause {
	/// Returns whether this cause signals an anomaly instead of traffic completion
	#[must_use]
	pub fn is_anomaly(&self) -> bool {
		matches!(self, Self::MaxTick | Self::Fault(_))
	}
}

impl fmt::Display for ExitCause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::DataLimit => f.pad("traffic data limit reached"),
			Self::DurationElapsed => f.pad("traffic duration elapsed"),
			Self::UpdateLimit => f.pad("update limit reached"),
			Self::MaxTick => f.pad("simulate() limit reached"),
			Self::Fault(msg) => write!(f, "fault: {msg}"),
		}
	}
}

/// Statistics snapshot.
///
/// An opaque json tree. Components live under `system`, e.g. the generator
/// statistics are in `system.processor`.
#[derive(PartialEq, Clone, Debug)]
pub struct StatsSnapshot(serde_json::Value);

impl StatsSnapshot {
	/// Wraps a json tree
	#[must_use]
	pub fn new(value: serde_json::Value) -> Self {
		Self(value)
	}

	/// Returns the subtree of component `name` under `system`
	#[must_use]
	pub fn component(&self, name: &str) -> Option<&serde_json::Value> {
		self.0.get("system")?.get(name)
	}

	/// Returns the processor subtree
	#[must_use]
	pub fn processor(&self) -> Option<&serde_json::Value> {
		self.component("processor")
	}

	/// Returns the whole tree
	#[must_use]
	pub fn as_value(&self) -> &serde_json::Value {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn anomalies() {
		assert!(!ExitCause::DataLimit.is_anomaly());
		assert!(!ExitCause::DurationElapsed.is_anomaly());
		assert!(ExitCause::MaxTick.is_anomaly());
		assert!(ExitCause::Fault("bus error".to_owned()).is_anomaly());
		assert_eq!(ExitCause::Fault("bus error".to_owned()).to_string(), "fault: bus error");
	}

	#[test]
	fn snapshot_subtrees() {
		let snapshot = StatsSnapshot::new(serde_json::json!({
			"simTicks": 10,
			"system": { "processor": { "numCores": 1 } },
		}));

		assert_eq!(snapshot.processor(), Some(&serde_json::json!({ "numCores": 1 })));
		assert_eq!(snapshot.component("memory"), None);
		assert_eq!(snapshot.as_value()["simTicks"], 10);
	}
}
