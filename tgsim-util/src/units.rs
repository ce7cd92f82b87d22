//! Units
//!
//! Quantities used to describe components, and parsing of simulated times
//! such as `"250us"` or `"60ns"`.
//!
//! Memory sizes and bandwidths use binary prefixes (`KiB`, `GB/s == GiB/s`).

// Imports
use {
	crate::SimDuration,
	std::{fmt, str::FromStr},
};

/// Unit parsing error
#[derive(PartialEq, Clone, Debug, thiserror::Error)]
pub enum UnitError {
	/// Missing or malformed number
	#[error("Invalid number in {input:?}")]
	Number { input: String },

	/// Unknown unit suffix
	#[error("Unknown unit {unit:?} in {input:?}, expected one of: {expected}")]
	Unit {
		input:    String,
		unit:     String,
		expected: &'static str,
	},

	/// Negative or non-finite quantity
	#[error("Quantity {input:?} must be a finite, non-negative value")]
	Range { input: String },
}

/// Splits `input` into its numeric part and its unit suffix
fn split_quantity(input: &str) -> Result<(f64, &str), UnitError> {
	let input = input.trim();

	let unit_start = input
		.find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+' || ch == 'e'))
		.unwrap_or(input.len());
	let (number, unit) = input.split_at(unit_start);
	let value = number.parse::<f64>().map_err(|_| UnitError::Number {
		input: input.to_owned(),
	})?;
	if !value.is_finite() || value < 0.0 {
		return Err(UnitError::Range {
			input: input.to_owned(),
		});
	}

	Ok((value, unit.trim()))
}

/// Size in bytes
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
	/// Creates a size of `kib` kibibytes
	#[must_use]
	pub const fn kib(kib: u64) -> Self {
		Self(kib << 10)
	}

	/// Creates a size of `mib` mebibytes
	#[must_use]
	pub const fn mib(mib: u64) -> Self {
		Self(mib << 20)
	}

	/// Creates a size of `gib` gibibytes
	#[must_use]
	pub const fn gib(gib: u64) -> Self {
		Self(gib << 30)
	}

	/// Returns the number of bytes
	#[must_use]
	pub const fn bytes(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ByteSize {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		const UNITS: [(u64, &str); 4] = [(1 << 40, "TiB"), (1 << 30, "GiB"), (1 << 20, "MiB"), (1 << 10, "KiB")];

		for (size, unit) in UNITS {
			if self.0 >= size && self.0 % size == 0 {
				return write!(f, "{}{unit}", self.0 / size);
			}
		}

		write!(f, "{}B", self.0)
	}
}

/// Bandwidth, in bytes per second
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub struct Bandwidth(f64);

impl Bandwidth {
	/// Creates a bandwidth from bytes per second
	#[must_use]
	pub const fn from_bytes_per_sec(bytes_per_sec: f64) -> Self {
		Self(bytes_per_sec)
	}

	/// Creates a bandwidth of `gb` gigabytes (binary) per second
	#[must_use]
	pub fn from_gb_per_sec(gb: f64) -> Self {
		Self::from_bytes_per_sec(gb * (1u64 << 30) as f64)
	}

	/// Returns the bytes per second
	#[must_use]
	pub const fn bytes_per_sec(self) -> f64 {
		self.0
	}

	/// Returns the number of ticks needed to transfer `bytes` at this bandwidth.
	///
	/// Rounds up, so any non-empty transfer takes at least 1 tick.
	#[must_use]
	pub fn transfer_ticks(self, bytes: u64) -> u64 {
		if bytes == 0 || self.0 <= 0.0 {
			return 0;
		}

		let ticks = (bytes as f64 * SimDuration::PICOS_PER_SEC as f64 / self.0).ceil() as u64;
		ticks.max(1)
	}
}

impl fmt::Display for Bandwidth {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}GB/s", self.0 / (1u64 << 30) as f64)
	}
}

/// Clock frequency, in hertz
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Frequency(u64);

impl Frequency {
	/// Creates a frequency from hertz
	#[must_use]
	pub const fn from_hz(hz: u64) -> Self {
		Self(hz)
	}

	/// Returns the frequency in hertz
	#[must_use]
	pub const fn hz(self) -> u64 {
		self.0
	}

	/// Returns the clock period in ticks.
	///
	/// Returns `0` for a zero frequency.
	#[must_use]
	pub const fn period_ticks(self) -> u64 {
		match self.0 {
			0 => 0,
			hz => SimDuration::PICOS_PER_SEC / hz,
		}
	}
}

impl fmt::Display for Frequency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0 {
			hz if hz >= 1_000_000_000 && hz % 1_000_000 == 0 => write!(f, "{}GHz", hz as f64 / 1e9),
			hz if hz >= 1_000_000 && hz % 1_000 == 0 => write!(f, "{}MHz", hz as f64 / 1e6),
			hz => write!(f, "{hz}Hz"),
		}
	}
}

impl FromStr for SimDuration {
	type Err = UnitError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (value, unit) = split_quantity(s)?;
		let picos_per_unit = match unit {
			"ps" => 1,
			"ns" => Self::PICOS_PER_NANO,
			"us" | "µs" => Self::PICOS_PER_MICRO,
			"ms" => Self::PICOS_PER_MILLI,
			"s" => Self::PICOS_PER_SEC,
			_ =>
				return Err(UnitError::Unit {
					input:    s.to_owned(),
					unit:     unit.to_owned(),
					expected: "ps, ns, us, ms, s",
				}),
		};

		Ok(Self::from_picos((value * picos_per_unit as f64).round() as u64))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byte_size_labels() {
		assert_eq!(ByteSize(0x8000).to_string(), "32KiB");
		assert_eq!(ByteSize(0x40000).to_string(), "256KiB");
		assert_eq!(ByteSize(0x100000).to_string(), "1MiB");
		assert_eq!(ByteSize(100).to_string(), "100B");
	}

	#[test]
	fn bandwidths() {
		let bw = Bandwidth::from_gb_per_sec(1000.0);
		// 64 bytes at ~1 TB/s take a handful of pico-seconds
		assert_eq!(bw.transfer_ticks(64), 60);
		assert_eq!(bw.transfer_ticks(0), 0);
		assert_eq!(Bandwidth::from_gb_per_sec(1.0).bytes_per_sec(), 1_073_741_824.0);
		assert_eq!(bw.to_string(), "1000GB/s");
	}

	#[test]
	fn frequencies() {
		let freq = Frequency::from_hz(4_000_000_000);
		assert_eq!(freq.period_ticks(), 250);
		assert_eq!(freq.to_string(), "4GHz");
	}

	#[test]
	fn durations() {
		assert_eq!("250us".parse::<SimDuration>(), Ok(SimDuration::from_micros(250)));
		assert_eq!("60ns".parse::<SimDuration>(), Ok(SimDuration::from_nanos(60)));
		assert_eq!("0ns".parse::<SimDuration>(), Ok(SimDuration::ZERO));
		assert_eq!("1.5ms".parse::<SimDuration>(), Ok(SimDuration::from_micros(1500)));
		assert_eq!(" 250ps ".parse::<SimDuration>(), Ok(SimDuration::from_picos(250)));
	}

	#[test]
	fn durations_parse_their_display() {
		for duration in [SimDuration::from_picos(250), SimDuration::from_nanos(60), SimDuration::from_micros(250)] {
			assert_eq!(duration.to_string().parse::<SimDuration>(), Ok(duration));
		}
	}

	#[test]
	fn rejects_bad_durations() {
		assert!(matches!("us".parse::<SimDuration>(), Err(UnitError::Number { .. })));
		assert!(matches!("10 parsecs".parse::<SimDuration>(), Err(UnitError::Unit { .. })));
		assert!(matches!("-1ns".parse::<SimDuration>(), Err(UnitError::Range { .. })));
	}
}
