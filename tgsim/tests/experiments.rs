//! End to end experiment tests

// Imports
use {
	std::{fs, path::Path, process::Command},
	tgsim::{
		components::{CacheClass, GeneratorClass, GupsClass, MemoryClass, TrafficIntensity},
		experiment::ExperimentPlan,
		ConfigError,
		EngineConfig,
		ExitCause,
		Experiment,
		RunConfig,
	},
	tgsim_util::ByteSize,
};

fn read_json(path: &Path) -> serde_json::Value {
	serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Returns the sorted names of all files in `path`
fn file_names(path: &Path) -> Vec<String> {
	let mut names = fs::read_dir(path)
		.unwrap()
		.map(|entry| entry.unwrap().file_name().into_string().unwrap())
		.collect::<Vec<_>>();
	names.sort();
	names
}

#[test]
fn cache_test_private_l1() {
	let experiment = Experiment::CacheTest {
		cache_class: CacheClass::PrivateL1,
	};

	let plan = ExperimentPlan::build(&experiment).unwrap();
	let cache_hierarchy = plan.board.cache_hierarchy();
	assert_eq!(cache_hierarchy.l1i.unwrap().size, ByteSize::kib(32));
	assert_eq!(cache_hierarchy.l1d.unwrap().size, ByteSize::kib(32));

	let dir = tempfile::tempdir().unwrap();
	let outdir = dir.path().join("m5out");
	let report = tgsim::run(&RunConfig {
		experiment,
		outdir: outdir.clone(),
		engine: EngineConfig::default(),
	})
	.unwrap();

	let file_names = report
		.phases
		.iter()
		.map(|phase| phase.stats_path.as_ref().unwrap().file_name().unwrap().to_str().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(file_names, ["stats_32KiB.json", "stats_256KiB.json", "stats_1MiB.json"]);
	assert!(report.phases.iter().all(|phase| phase.cause == ExitCause::DataLimit));

	// Ticks never go backwards across phases
	let ticks = report
		.phases
		.iter()
		.flat_map(|phase| [phase.start_tick, phase.exit_tick])
		.collect::<Vec<_>>();
	assert!(ticks.windows(2).all(|window| window[0] <= window[1]), "Ticks {ticks:?}");

	// Each file only holds its own phase's traffic
	let bytes_read = report
		.phases
		.iter()
		.map(|phase| read_json(phase.stats_path.as_ref().unwrap())["bytesRead"].as_u64().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(bytes_read, [0x8000, 0x40000, 0x100000]);

	let full_stats = fs::read_to_string(outdir.join("stats.txt")).unwrap();
	assert_eq!(full_stats.matches("---------- Begin Simulation Statistics ----------").count(), 3);
	assert!(full_stats.contains("system.cache_hierarchy.l1d.misses"));
}

#[test]
fn gups_test_single_core() {
	let dir = tempfile::tempdir().unwrap();
	let report = tgsim::run(&RunConfig {
		experiment: Experiment::GupsTest {
			gups_class:   GupsClass::Gups,
			cache_class:  CacheClass::PrivateL1PrivateL2,
			update_limit: 500,
			num_cores:    1,
		},
		outdir:     dir.path().to_owned(),
		engine:     EngineConfig::default(),
	})
	.unwrap();

	assert_eq!(report.phases.len(), 1);
	assert_eq!(report.phases[0].cause, ExitCause::UpdateLimit);

	let processor = read_json(&dir.path().join("processor_stats.json"));
	assert_eq!(processor["numCores"], 1);
	assert_eq!(processor["cores"][0]["numUpdates"], 500);
}

#[test]
fn memory_test_dumps_processor_stats_only() {
	let dir = tempfile::tempdir().unwrap();
	let report = tgsim::run(&RunConfig {
		experiment: Experiment::MemoryTest {
			generator_class:   GeneratorClass::Random,
			traffic_intensity: TrafficIntensity::Unloaded,
			memory_class:      MemoryClass::DDR3,
			num_channels:      2,
		},
		outdir:     dir.path().to_owned(),
		engine:     EngineConfig::default(),
	})
	.unwrap();

	assert_eq!(report.phases.len(), 1);
	assert_eq!(report.phases[0].cause, ExitCause::DurationElapsed);
	assert_eq!(report.phases[0].exit_tick, 250_000_000);
	assert_eq!(file_names(dir.path()), ["processor_stats.json"]);

	let processor = read_json(&dir.path().join("processor_stats.json"));
	assert!(processor["bytesRead"].as_u64().unwrap() > 0);
}

#[test]
fn multi_channel_writes_no_files() {
	let dir = tempfile::tempdir().unwrap();
	let outdir = dir.path().join("m5out");
	let report = tgsim::run(&RunConfig {
		experiment: Experiment::MultiChannel,
		outdir:     outdir.clone(),
		engine:     EngineConfig::default(),
	})
	.unwrap();

	assert_eq!(report.phases.len(), 1);
	assert_eq!(report.phases[0].cause, ExitCause::DurationElapsed);
	assert_eq!(report.phases[0].cause.to_string(), "traffic duration elapsed");
	assert_eq!(report.phases[0].stats_path, None);
	assert!(file_names(&outdir).is_empty());
}

#[test]
fn unknown_memory_class() {
	let err = "DDR5".parse::<MemoryClass>().unwrap_err();
	assert!(matches!(err, ConfigError::UnknownSelector { .. }));
	assert!(err.to_string().contains("DDR3, DDR4, LPDDR3, LPDDR5, HBM"));
}

#[test]
fn cli_cache_test() {
	let dir = tempfile::tempdir().unwrap();
	let output = Command::new(env!("CARGO_BIN_EXE_tgsim"))
		.args(["cache-test", "NoCache", "--outdir"])
		.arg(dir.path())
		.output()
		.unwrap();
	assert!(output.status.success(), "{output:?}");

	let stdout = String::from_utf8(output.stdout).unwrap();
	let lines = stdout.lines().collect::<Vec<_>>();
	assert_eq!(lines.first(), Some(&"Beginning simulation! With 32KiB data limit"));
	assert_eq!(lines.last(), Some(&"Simulation finished!"));
	assert_eq!(
		lines
			.iter()
			.filter(|line| line.ends_with("because traffic data limit reached."))
			.count(),
		3
	);
	for file_name in ["stats_32KiB.json", "stats_256KiB.json", "stats_1MiB.json"] {
		assert!(dir.path().join(file_name).is_file(), "Missing {file_name}");
	}
}

#[test]
fn cli_memory_test() {
	let dir = tempfile::tempdir().unwrap();
	let output = Command::new(env!("CARGO_BIN_EXE_tgsim"))
		.args(["memory-test", "Linear", "Unloaded", "DDR4", "1", "--outdir"])
		.arg(dir.path())
		.output()
		.unwrap();
	assert!(output.status.success(), "{output:?}");

	let stdout = String::from_utf8(output.stdout).unwrap();
	assert_eq!(stdout.lines().collect::<Vec<_>>(), [
		"Beginning simulation",
		"Exiting @ tick 250000000 because traffic duration elapsed.",
		"Simulation finished",
	]);
	assert_eq!(file_names(dir.path()), ["processor_stats.json"]);
}

#[test]
fn cli_multi_channel() {
	let dir = tempfile::tempdir().unwrap();
	let output = Command::new(env!("CARGO_BIN_EXE_tgsim"))
		.args(["multi-channel", "--outdir"])
		.arg(dir.path())
		.output()
		.unwrap();
	assert!(output.status.success(), "{output:?}");

	let stdout = String::from_utf8(output.stdout).unwrap();
	assert_eq!(stdout.lines().collect::<Vec<_>>(), [
		"Beginning simulation!",
		"Exiting @ tick 100000000 because traffic duration elapsed.",
	]);
	assert!(file_names(dir.path()).is_empty());
}

#[test]
fn cli_rejects_unknown_memory_class() {
	let dir = tempfile::tempdir().unwrap();
	let outdir = dir.path().join("m5out");
	let output = Command::new(env!("CARGO_BIN_EXE_tgsim"))
		.args(["memory-test", "Linear", "Loaded", "DDR5", "1", "--outdir"])
		.arg(&outdir)
		.output()
		.unwrap();

	assert_eq!(output.status.code(), Some(2));
	assert!(!outdir.exists());
}

#[test]
fn cli_rejects_multi_core_gups() {
	let dir = tempfile::tempdir().unwrap();
	let outdir = dir.path().join("m5out");
	let output = Command::new(env!("CARGO_BIN_EXE_tgsim"))
		.args(["gups-test", "GUPS", "NoCache", "100", "2", "--outdir"])
		.arg(&outdir)
		.output()
		.unwrap();

	assert_eq!(output.status.code(), Some(1));
	assert!(!outdir.exists());
}
