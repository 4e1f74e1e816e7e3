//! Fleet Sim - async runtime for simulated drone fleets
//!
//! Runs one tokio task per drone, fans telemetry out to pluggable sinks and
//! keeps the latest state of every drone and zone in memory.

pub mod config;
pub mod error;
pub mod fleet;
pub mod runner;
pub mod sink;
pub mod state;

pub use config::Config;
pub use error::{ConfigError, FleetError, SinkError};
pub use fleet::FleetManager;
pub use runner::{spawn_drone, DroneCommand, DroneHandle, RunnerParams};
pub use sink::{ChannelSink, FanoutSink, TelemetrySink, TracingSink};
pub use state::FleetState;
