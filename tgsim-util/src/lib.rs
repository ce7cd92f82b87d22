//! Utilities

// Modules
pub mod duration;
pub mod logger;
pub mod units;

// Exports
pub use {
	duration::SimDuration,
	units::{Bandwidth, ByteSize, Frequency, UnitError},
};

// Imports
use std::{cell::RefCell, fmt};

/// Extension trait for JSON statistics trees
#[extend::ext(name = FlattenStats)]
pub impl serde_json::Value {
	/// Flattens this tree into `(name, value)` pairs.
	///
	/// Object keys and array indices are joined with `.` onto `prefix`.
	/// Leaves are returned in the tree's iteration order.
	fn flatten_stats(&self, prefix: &str) -> Vec<(String, String)> {
		let mut entries = vec![];
		flatten_into(self, prefix.to_owned(), &mut entries);
		entries
	}
}

fn flatten_into(value: &serde_json::Value, name: String, entries: &mut Vec<(String, String)>) {
	let join = |key: &dyn fmt::Display| match name.is_empty() {
		true => key.to_string(),
		false => format!("{name}.{key}"),
	};

	match value {
		serde_json::Value::Object(map) =>
			for (key, value) in map {
				flatten_into(value, join(key), entries);
			},
		serde_json::Value::Array(values) =>
			for (idx, value) in values.iter().enumerate() {
				flatten_into(value, join(&idx), entries);
			},
		serde_json::Value::Null => entries.push((name, "nan".to_owned())),
		serde_json::Value::String(s) => entries.push((name, s.clone())),
		serde_json::Value::Bool(b) => entries.push((name, b.to_string())),
		serde_json::Value::Number(n) => entries.push((name, n.to_string())),
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}


impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}
