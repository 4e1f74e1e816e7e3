//! Core data models for the fleet simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FormationError, ZoneError};
use crate::spatial;

/// Flight state of a simulated drone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    /// On the ground, motors off
    #[default]
    Idle,
    /// Motors armed, waiting to take off
    Armed,
    /// Climbing to the initial altitude
    Takeoff,
    /// Following a waypoint
    Flying,
    /// Descending to touchdown
    Landing,
    /// Reserved; the simulator never enters it
    Error,
}

impl DroneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneStatus::Idle => "idle",
            DroneStatus::Armed => "armed",
            DroneStatus::Takeoff => "takeoff",
            DroneStatus::Flying => "flying",
            DroneStatus::Landing => "landing",
            DroneStatus::Error => "error",
        }
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Telemetry snapshot emitted by a simulated drone once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub drone_id: String,
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
    #[serde(rename = "altitude")]
    pub altitude_m: f64,
    #[serde(rename = "heading")]
    pub heading_deg: f64,
    #[serde(rename = "velocity")]
    pub velocity_mps: f64,
    #[serde(rename = "battery")]
    pub battery_pct: f64,
    pub status: DroneStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "vertical_speed", default)]
    pub vertical_speed_mps: f64,
    #[serde(default)]
    pub rtk_fix: bool,
    #[serde(rename = "max_speed", default)]
    pub max_speed_mps: f64,
    #[serde(rename = "max_altitude", default)]
    pub max_altitude_m: f64,
    /// Estimated endurance left, in seconds
    #[serde(rename = "flight_time_remaining", default)]
    pub flight_time_remaining_s: f64,
}

// ========== ZONES ==========

/// Rectangle drawn by the operator, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ZoneBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Reject rectangles that cannot be laid out.
    ///
    /// Zero width or height is allowed; formations collapse onto a line.
    pub fn validate(&self) -> Result<(), ZoneError> {
        let all_finite = [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ZoneError::NonFinite);
        }
        if self.north < self.south {
            return Err(ZoneError::InvertedLatitude {
                north: self.north,
                south: self.south,
            });
        }
        if self.east < self.west {
            return Err(ZoneError::InvertedLongitude {
                east: self.east,
                west: self.west,
            });
        }
        Ok(())
    }

    /// (lat, lon) of the rectangle center.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Half of the east-west extent, in degrees longitude.
    pub fn half_width(&self) -> f64 {
        (self.east - self.west) / 2.0
    }

    /// Half of the north-south extent, in degrees latitude.
    pub fn half_height(&self) -> f64 {
        (self.north - self.south) / 2.0
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Approximate area in square kilometers.
    pub fn area_km2(&self) -> f64 {
        spatial::zone_area_km2(self)
    }
}

/// Operator-drawn area of interest. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub bounds: ZoneBounds,
    pub created_at: DateTime<Utc>,
}

impl Zone {
    /// Create a zone with a fresh UUID.
    pub fn new(bounds: ZoneBounds) -> Result<Self, ZoneError> {
        Self::with_id(uuid::Uuid::new_v4().to_string(), bounds)
    }

    /// Create a zone with a caller-provided id (e.g. from the map layer).
    pub fn with_id(id: impl Into<String>, bounds: ZoneBounds) -> Result<Self, ZoneError> {
        bounds.validate()?;
        Ok(Self {
            id: id.into(),
            bounds,
            created_at: Utc::now(),
        })
    }
}

// ========== FORMATIONS ==========

/// Geometric pattern used to spread drones over a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormationKind {
    /// Rows and columns covering the zone
    Grid,
    /// North-south line through the center
    Line,
    /// Ring around the center
    Circle,
    /// Center-out spiral search
    Spiral,
    /// Grid with alternating row direction
    Zigzag,
}

impl FormationKind {
    pub const ALL: [FormationKind; 5] = [
        FormationKind::Grid,
        FormationKind::Line,
        FormationKind::Circle,
        FormationKind::Spiral,
        FormationKind::Zigzag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormationKind::Grid => "grid",
            FormationKind::Line => "line",
            FormationKind::Circle => "circle",
            FormationKind::Spiral => "spiral",
            FormationKind::Zigzag => "zigzag",
        }
    }
}

impl fmt::Display for FormationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormationKind {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FormationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| FormationError::UnknownKind(s.to_string()))
    }
}

/// Target position assigned to one drone by a formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationWaypoint {
    pub drone_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DroneStatus::Landing).unwrap();
        assert_eq!(json, "\"landing\"");
    }

    #[test]
    fn test_telemetry_uses_wire_names() {
        let telemetry = Telemetry {
            drone_id: "DRONE_000".to_string(),
            lat: 20.9674,
            lon: -89.5926,
            altitude_m: 42.0,
            heading_deg: 90.0,
            velocity_mps: 3.0,
            battery_pct: 88.0,
            status: DroneStatus::Flying,
            timestamp: Utc::now(),
            vertical_speed_mps: 0.0,
            rtk_fix: true,
            max_speed_mps: 23.0,
            max_altitude_m: 5000.0,
            flight_time_remaining_s: 1000.0,
        };
        let value = serde_json::to_value(&telemetry).unwrap();
        assert_eq!(value["latitude"], 20.9674);
        assert_eq!(value["altitude"], 42.0);
        assert_eq!(value["status"], "flying");
        assert_eq!(value["flight_time_remaining"], 1000.0);
    }

    #[test]
    fn test_zone_rejects_inverted_bounds() {
        let bounds = ZoneBounds::new(20.0, 21.0, -89.0, -90.0);
        assert!(matches!(
            Zone::new(bounds),
            Err(ZoneError::InvertedLatitude { .. })
        ));

        let bounds = ZoneBounds::new(21.0, 20.0, -90.0, -89.0);
        assert!(matches!(
            Zone::new(bounds),
            Err(ZoneError::InvertedLongitude { .. })
        ));
    }

    #[test]
    fn test_zone_rejects_nan() {
        let bounds = ZoneBounds::new(f64::NAN, 20.0, -89.0, -90.0);
        assert_eq!(bounds.validate(), Err(ZoneError::NonFinite));
    }

    #[test]
    fn test_degenerate_zone_is_accepted() {
        let bounds = ZoneBounds::new(21.0, 21.0, -89.0, -90.0);
        assert!(Zone::with_id("zone_1", bounds).is_ok());
    }

    #[test]
    fn test_formation_kind_parses() {
        assert_eq!("grid".parse::<FormationKind>().unwrap(), FormationKind::Grid);
        assert_eq!(" ZigZag ".parse::<FormationKind>().unwrap(), FormationKind::Zigzag);
        assert!("diamond".parse::<FormationKind>().is_err());
    }
}
