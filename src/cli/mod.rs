//! CLI module for the zerocoin engine

pub mod app;
pub mod commands;

pub use app::{
    describe_denominations, inspect_snapshot, load_config, SimulationApp, SimulationParams,
    SimulationReport,
};
pub use commands::{Cli, Commands, SelectorKind};
