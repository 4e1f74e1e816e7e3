//! Error types for the core crate.

/// Errors raised by the drone simulator's command interface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("Invalid waypoint ({lat}, {lon}, {altitude_m}m): coordinates must be finite")]
    InvalidWaypoint { lat: f64, lon: f64, altitude_m: f64 },
}

/// Errors raised when validating an operator zone.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoneError {
    #[error("Zone bounds must be finite")]
    NonFinite,

    #[error("Zone north ({north}) is below south ({south})")]
    InvertedLatitude { north: f64, south: f64 },

    #[error("Zone east ({east}) is west of west ({west})")]
    InvertedLongitude { east: f64, west: f64 },
}

/// Errors raised by the formation calculator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormationError {
    #[error("Unknown formation: {0}")]
    UnknownKind(String),
}
