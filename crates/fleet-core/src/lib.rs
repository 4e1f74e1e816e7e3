//! Fleet Core - drone kinematics and formation layout
//!
//! Pure, synchronous building blocks of the fleet simulator: data models,
//! flat-earth spatial helpers, the per-drone kinematic simulator and the
//! formation waypoint calculator.

pub mod error;
pub mod formation;
pub mod models;
pub mod simulator;
pub mod spatial;

pub use error::{FormationError, SimError, ZoneError};
pub use formation::{calculate, calculate_for_zone, FORMATION_ALTITUDE_M};
pub use models::{
    DroneStatus, FormationKind, FormationWaypoint, Telemetry, Zone, ZoneBounds,
};
pub use simulator::{DroneSim, SimEvent, SimParams};
pub use spatial::haversine_distance;
