//! Simulator configuration from environment or a JSON file.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Center of the initial drone layout (Mérida, Yucatán)
    pub home_lat: f64,
    pub home_lon: f64,
    /// Drones started by default
    pub drone_count: usize,
    /// Upper bound on simultaneously running drones
    pub max_drones: usize,
    /// Simulation tick in milliseconds
    pub tick_interval_ms: u64,
    /// Wait between arming and takeoff in milliseconds
    pub arm_delay_ms: u64,
    /// Takeoff altitude is drawn from this range (meters)
    pub takeoff_altitude_min_m: f64,
    pub takeoff_altitude_max_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_lat: 20.9674,
            home_lon: -89.5926,
            drone_count: 3,
            max_drones: 10,
            tick_interval_ms: 500,
            arm_delay_ms: 2000,
            takeoff_altitude_min_m: 30.0,
            takeoff_altitude_max_m: 100.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or unparsable keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            home_lat: parse_or(&lookup, "FLEET_HOME_LAT", defaults.home_lat),
            home_lon: parse_or(&lookup, "FLEET_HOME_LON", defaults.home_lon),
            drone_count: parse_or(&lookup, "FLEET_DRONE_COUNT", defaults.drone_count),
            max_drones: parse_or(&lookup, "FLEET_MAX_DRONES", defaults.max_drones),
            tick_interval_ms: parse_or(&lookup, "FLEET_TICK_MS", defaults.tick_interval_ms),
            arm_delay_ms: parse_or(&lookup, "FLEET_ARM_DELAY_MS", defaults.arm_delay_ms),
            ..defaults
        }
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(self.arm_delay_ms)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FLEET_DRONE_COUNT", "7"),
            ("FLEET_TICK_MS", "250"),
            ("FLEET_HOME_LAT", "not-a-number"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.drone_count, 7);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.home_lat, Config::default().home_lat);
        assert_eq!(config.max_drones, 10);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("fleet-sim-config-does-not-exist.json");
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_round_trip_with_partial_fields() {
        let path = std::env::temp_dir().join(format!("fleet-sim-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"drone_count": 5, "home_lon": -89.6}"#).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.drone_count, 5);
        assert_eq!(config.home_lon, -89.6);
        assert_eq!(config.arm_delay_ms, 2000);

        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("fleet-sim-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
