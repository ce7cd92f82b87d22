//! Logger
//!
//! Logs to stderr, filtered by `RUST_LOG` (defaults to `info`), and
//! optionally to a file, filtered by `RUST_LOG_FILE` (defaults to `debug`).

// Imports
use {
	std::{fs, path::Path, sync::Mutex},
	tracing_subscriber::{prelude::*, EnvFilter},
};

/// Logging before the logger is initialized.
///
/// Messages are buffered and emitted once [`init`](super::init) runs.
pub mod pre_init {
	// Imports
	use std::sync::Mutex;

	/// Buffered messages
	static MESSAGES: Mutex<Vec<Message>> = Mutex::new(Vec::new());

	/// A buffered message
	pub(super) enum Message {
		Debug(String),
		Warn(String),
	}

	/// Buffers a debug message
	pub fn debug(message: impl Into<String>) {
		self::push(Message::Debug(message.into()));
	}

	/// Buffers a warning message
	pub fn warn(message: impl Into<String>) {
		self::push(Message::Warn(message.into()));
	}

	fn push(message: Message) {
		// Note: A poisoned buffer only means another thread panicked mid-push,
		//       the messages themselves are still valid.
		let mut messages = MESSAGES.lock().unwrap_or_else(|err| err.into_inner());
		messages.push(message);
	}

	/// Takes all buffered messages
	pub(super) fn take() -> Vec<Message> {
		let mut messages = MESSAGES.lock().unwrap_or_else(|err| err.into_inner());
		std::mem::take(&mut *messages)
	}
}

/// Initializes the logger.
///
/// If `log_file` is set, also logs to it, appending if `log_file_append` is set.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let env_filter = |var: &str, default: &str| EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default));

	let term_layer = tracing_subscriber::fmt::layer()
		.with_writer(std::io::stderr)
		.with_filter(env_filter("RUST_LOG", "info"));

	let mut file_open_err = None;
	let file_layer = log_file.and_then(|path| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(path);

		match file {
			Ok(file) => Some(
				tracing_subscriber::fmt::layer()
					.with_ansi(false)
					.with_writer(Mutex::new(file))
					.with_filter(env_filter("RUST_LOG_FILE", "debug")),
			),
			Err(err) => {
				file_open_err = Some(format!("Unable to open log file {path:?}: {err}"));
				None
			},
		}
	});

	if let Err(err) = tracing_subscriber::registry().with(term_layer).with(file_layer).try_init() {
		eprintln!("Unable to initialize logger: {err}");
		return;
	}

	if let Some(err) = file_open_err {
		tracing::warn!("{err}");
	}

	for message in pre_init::take() {
		match message {
			pre_init::Message::Debug(message) => tracing::debug!("{message}"),
			pre_init::Message::Warn(message) => tracing::warn!("{message}"),
		}
	}
}
