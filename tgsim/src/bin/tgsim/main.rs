//! Traffic-generator test-board simulator (`tgsim`)

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	tgsim::{EngineConfig, RunConfig},
	tgsim_util::logger,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));
	if args.log_file_append && args.log_file.is_none() {
		logger::pre_init::warn("`--log-file-append` has no effect without `--log-file`");
	}

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Read the config file
	let engine = match &args.config_file {
		Some(config_file) => EngineConfig::from_file(config_file).context("Unable to load engine config")?,
		None => EngineConfig::default(),
	};
	tracing::debug!(?engine, "Engine config");

	let config = RunConfig {
		experiment: args.experiment.into(),
		outdir: args.outdir,
		engine,
	};
	let report = tgsim::run(&config)?;
	for phase in &report.phases {
		tracing::debug!(?phase, "Phase report");
	}

	Ok(())
}
