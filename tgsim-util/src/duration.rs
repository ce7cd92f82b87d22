//! Duration

// Imports
use std::{fmt, ops};

/// Simulated duration with pico-second precision.
///
/// One pico-second is one simulator tick.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default, Hash)]
pub struct SimDuration {
	/// Pico seconds
	picos: u64,
}

impl SimDuration {
	/// Number of pico-seconds per nano-second
	pub const PICOS_PER_NANO: u64 = 1_000;
	/// Number of pico-seconds per micro-second
	pub const PICOS_PER_MICRO: u64 = 1_000_000;
	/// Number of pico-seconds per milli-second
	pub const PICOS_PER_MILLI: u64 = 1_000_000_000;
	/// Number of pico-seconds per second
	pub const PICOS_PER_SEC: u64 = 1_000_000_000_000;
	/// Zero duration
	pub const ZERO: Self = Self { picos: 0 };

	/// Creates a new duration from pico-seconds
	#[must_use]
	pub const fn from_picos(picos: u64) -> Self {
		Self { picos }
	}

	/// Creates a new duration from nano-seconds
	#[must_use]
	pub const fn from_nanos(nanos: u64) -> Self {
		Self::from_picos(nanos * Self::PICOS_PER_NANO)
	}

	/// Creates a new duration from micro-seconds
	#[must_use]
	pub const fn from_micros(micros: u64) -> Self {
		Self::from_picos(micros * Self::PICOS_PER_MICRO)
	}

	/// Returns the number of pico-seconds (ticks) in this duration
	#[must_use]
	pub const fn as_picos(self) -> u64 {
		self.picos
	}

	/// Returns this duration as floating-point seconds
	#[must_use]
	pub fn as_secs_f64(self) -> f64 {
		self.picos as f64 / Self::PICOS_PER_SEC as f64
	}
}

impl ops::Add for SimDuration {
	type Output = Self;

	fn add(self, rhs: Self) -> Self::Output {
		Self::from_picos(self.picos + rhs.picos)
	}
}

impl fmt::Display for SimDuration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let total_secs = self.picos / Self::PICOS_PER_SEC;
		let secs = total_secs % 60;
		let mins = total_secs / 60 % 60;
		let hours = total_secs / 60 / 60;

		let sub_secs = self.picos % Self::PICOS_PER_SEC;
		let picos = sub_secs % 1000;
		let nanos = sub_secs / 1000 % 1000;
		let micros = sub_secs / 1000 / 1000 % 1000;
		let millis = sub_secs / 1000 / 1000 / 1000 % 1000;

		match (hours, mins, secs, millis, micros, nanos, picos) {
			(0, 0, 0, 0, 0, 0, 0) => f.pad("0s"),

			// If we have no hours, mins or secs, format in the smallest unit
			(0, 0, 0, 0, 0, 0, _) => write!(f, "{picos}ps"),
			(0, 0, 0, 0, 0, ..) => write!(f, "{nanos}.{picos:03}ns"),
			(0, 0, 0, 0, ..) => write!(f, "{micros}.{nanos:03}{picos:03}µs"),
			(0, 0, 0, ..) => write!(f, "{millis}.{micros:03}{nanos:03}{picos:03}ms"),

			// Else format it as the decimal part
			(0, 0, ..) => write!(f, "{secs}.{millis:03}{micros:03}{nanos:03}s"),
			(0, ..) => write!(f, "{mins}m{secs}.{millis:03}s"),
			(..) => write!(f, "{hours}h{mins}m{secs}.{millis:03}s"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_picks_smallest_unit() {
		assert_eq!(SimDuration::ZERO.to_string(), "0s");
		assert_eq!(SimDuration::from_picos(250).to_string(), "250ps");
		assert_eq!(SimDuration::from_nanos(60).to_string(), "60.000ns");
		assert_eq!(SimDuration::from_micros(250).to_string(), "250.000000µs");
		assert_eq!(SimDuration::from_picos(1_500_000_000).to_string(), "1.500000000ms");
		assert_eq!(SimDuration::from_picos(61_500_000_000_000).to_string(), "1m1.500s");
	}

	#[test]
	fn seconds() {
		assert_eq!(SimDuration::from_micros(100).as_secs_f64(), 1e-4);
		assert_eq!(SimDuration::ZERO.as_secs_f64(), 0.0);
	}
}
