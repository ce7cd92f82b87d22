//! Traffic-generator test-board simulator (`tgsim`)
//!
//! Selects a traffic generator, a cache hierarchy and a memory, wires them
//! onto a test board and runs one or more statistics-dumping phases over an
//! [`Engine`].

// Modules
pub mod board;
pub mod components;
pub mod config;
pub mod driver;
pub mod engine;
pub mod experiment;
pub mod model;

// Exports
pub use self::{
	board::{ConnectedBoard, TestBoard},
	config::{ConfigError, EngineConfig, Experiment, RunConfig},
	driver::{Phase, PhaseOutput, RunReport, StagedRun},
	engine::{Engine, ExitCause, ExitEvent, StatsSnapshot, Tick},
	experiment::run,
	model::ModelEngine,
};
