//! Error types for the fleet runtime.

use fleet_core::SimError;

/// Errors a telemetry sink may report. They are logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Telemetry queue full, dropped record for {0}")]
    Full(String),

    #[error("Telemetry receiver closed")]
    Closed,

    #[error("Telemetry rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Drone not found: {0}")]
    UnknownDrone(String),

    #[error("Zone not found: {0}")]
    UnknownZone(String),

    #[error("No active zone")]
    NoActiveZone,

    #[error("Cannot start {requested} drone(s): {active} running, limit is {max}")]
    TooManyDrones {
        requested: usize,
        active: usize,
        max: usize,
    },

    #[error(transparent)]
    InvalidWaypoint(#[from] SimError),

    /// Some drones did not receive their formation waypoint; the rest did.
    #[error(
        "Formation sent to {dispatched} drone(s), failed for {}",
        .failed.join(", ")
    )]
    PartialFormation {
        dispatched: usize,
        failed: Vec<String>,
    },

    #[error("Command queue full for {0}")]
    CommandQueueFull(String),

    #[error("Drone {0} is no longer running")]
    DroneStopped(String),

    #[error("Drone task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}
