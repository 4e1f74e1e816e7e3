//! Kinematic telemetry simulator.
//!
//! Models a Matrice-300-RTK-class quadcopter: waypoint following with
//! rate-limited heading, speed and altitude changes, battery drain and a
//! forced landing when the battery runs low. The simulator is purely
//! synchronous; the caller owns the tick loop and the random source.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::error::SimError;
use crate::models::{DroneStatus, Telemetry};
use crate::spatial::{
    bearing_deg, heading_delta, meters_to_flat_deg, normalize_heading, planar_distance_m,
};

/// Maximum horizontal speed (82.8 km/h).
pub const MAX_SPEED_MPS: f64 = 23.0;
/// Service ceiling above ground level.
pub const MAX_ALTITUDE_M: f64 = 5000.0;
/// Endurance when cruising (TB60 battery).
pub const MAX_FLIGHT_TIME_S: f64 = 55.0 * 60.0;
/// Endurance when hovering.
pub const HOVER_FLIGHT_TIME_S: f64 = 60.0 * 60.0;
/// Battery drain while cruising, in % per second.
pub const BATTERY_DRAIN_FLYING_PCT_S: f64 = 100.0 / MAX_FLIGHT_TIME_S;
/// Battery drain while hovering or moving slowly, in % per second.
pub const BATTERY_DRAIN_HOVER_PCT_S: f64 = 100.0 / HOVER_FLIGHT_TIME_S;
/// Self-discharge applied every tick while idle.
pub const IDLE_SELF_DISCHARGE_PCT: f64 = 0.0001;
/// Above this speed the drone counts as cruising rather than hovering.
pub const CRUISE_SPEED_THRESHOLD_MPS: f64 = 5.0;
/// Below this speed an arriving drone is considered stopped.
const STOP_SPEED_MPS: f64 = 0.5;
/// Commanded speed is `distance / SPEED_DISTANCE_DIVISOR`, capped at max speed.
const SPEED_DISTANCE_DIVISOR: f64 = 5.0;

/// Tunable flight characteristics.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    /// Horizontal acceleration (m/s²)
    pub acceleration_rate: f64,
    /// Horizontal deceleration (m/s²)
    pub deceleration_rate: f64,
    /// Climb/descent rate (m/s)
    pub altitude_change_rate: f64,
    /// Maximum heading change per tick (degrees)
    pub max_heading_change_deg: f64,
    /// Distance at which a waypoint counts as reached (meters)
    pub arrival_threshold_m: f64,
    /// Chance per tick of picking a new random waypoint
    pub retarget_probability: f64,
    /// Random waypoints fall within ± this many degrees
    pub retarget_range_deg: f64,
    pub retarget_altitude_min_m: f64,
    pub retarget_altitude_max_m: f64,
    /// Below this battery level a flying drone is forced to land (%)
    pub low_battery_pct: f64,
    /// Position jitter bound per tick (meters)
    pub rtk_accuracy_m: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            acceleration_rate: 2.0,
            deceleration_rate: 2.0,
            altitude_change_rate: 2.0,
            max_heading_change_deg: 5.0,
            arrival_threshold_m: 5.0,
            retarget_probability: 0.005,
            retarget_range_deg: 0.05, // ~5.5km
            retarget_altitude_min_m: 20.0,
            retarget_altitude_max_m: 120.0,
            low_battery_pct: 10.0,
            rtk_accuracy_m: 0.01,
        }
    }
}

/// Notable transitions produced by a single [`DroneSim::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// A new random waypoint was picked
    Retargeted,
    /// The current waypoint was reached and the drone stopped
    Arrived,
    /// Battery dropped below the low threshold; landing started
    LowBatteryLanding,
    /// A landing drone reached the ground
    Touchdown,
    /// Battery is empty; the drone was forced to stop
    BatteryDepleted,
}

/// Mutable state of one simulated drone.
#[derive(Debug, Clone)]
pub struct DroneSim {
    pub drone_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub heading_deg: f64,
    pub velocity_mps: f64,
    pub battery_pct: f64,
    pub status: DroneStatus,
    pub target_lat: f64,
    pub target_lon: f64,
    pub target_altitude_m: f64,
    pub vertical_speed_mps: f64,
    pub rtk_fix: bool,
    /// Commanded horizontal speed
    pub speed_mps: f64,
    pub flight_start: Option<DateTime<Utc>>,
    pub params: SimParams,
}

impl DroneSim {
    /// Create a drone on the ground at (lat, lon) with a random heading.
    pub fn new<R: Rng + ?Sized>(drone_id: impl Into<String>, lat: f64, lon: f64, rng: &mut R) -> Self {
        Self::with_params(drone_id, lat, lon, SimParams::default(), rng)
    }

    pub fn with_params<R: Rng + ?Sized>(
        drone_id: impl Into<String>,
        lat: f64,
        lon: f64,
        params: SimParams,
        rng: &mut R,
    ) -> Self {
        Self {
            drone_id: drone_id.into(),
            lat,
            lon,
            altitude_m: 0.0,
            heading_deg: rng.random_range(0.0..360.0),
            velocity_mps: 0.0,
            battery_pct: 100.0,
            status: DroneStatus::Idle,
            target_lat: lat,
            target_lon: lon,
            target_altitude_m: 0.0,
            vertical_speed_mps: 0.0,
            rtk_fix: true,
            speed_mps: 0.0,
            flight_start: None,
            params,
        }
    }

    /// Command interface: fly to a new waypoint.
    pub fn set_target(&mut self, lat: f64, lon: f64, altitude_m: f64) -> Result<(), SimError> {
        if !(lat.is_finite() && lon.is_finite() && altitude_m.is_finite()) {
            return Err(SimError::InvalidWaypoint {
                lat,
                lon,
                altitude_m,
            });
        }
        self.target_lat = lat;
        self.target_lon = lon;
        self.target_altitude_m = altitude_m.clamp(0.0, MAX_ALTITUDE_M);
        self.status = DroneStatus::Flying;
        self.flight_start.get_or_insert_with(Utc::now);
        Ok(())
    }

    /// Whether the drone is off the ground.
    pub fn is_airborne(&self) -> bool {
        self.altitude_m > 0.0
    }

    /// Planar distance to the current waypoint in meters.
    pub fn distance_to_target_m(&self) -> f64 {
        planar_distance_m(self.lat, self.lon, self.target_lat, self.target_lon)
    }

    /// Arm motors. Only an idle drone can be armed.
    pub fn arm(&mut self) -> bool {
        if self.status != DroneStatus::Idle {
            return false;
        }
        self.status = DroneStatus::Armed;
        true
    }

    /// Vertical takeoff towards `takeoff_altitude_m`.
    ///
    /// Returns true once the altitude is reached; the drone is then
    /// `Flying` and holds its position.
    pub fn climb_step(&mut self, dt: f64, takeoff_altitude_m: f64) -> bool {
        let takeoff_altitude_m = takeoff_altitude_m.clamp(0.0, MAX_ALTITUDE_M);
        self.status = DroneStatus::Takeoff;
        self.flight_start.get_or_insert_with(Utc::now);

        let remaining = takeoff_altitude_m - self.altitude_m;
        let max_change = self.params.altitude_change_rate * dt;
        if remaining > max_change {
            self.altitude_m += max_change;
            self.vertical_speed_mps = self.params.altitude_change_rate;
            return false;
        }

        self.altitude_m = takeoff_altitude_m;
        self.vertical_speed_mps = 0.0;
        self.target_lat = self.lat;
        self.target_lon = self.lon;
        self.target_altitude_m = takeoff_altitude_m;
        self.status = DroneStatus::Flying;
        true
    }

    /// Controlled descent used when the drone is stopped.
    ///
    /// Returns true on touchdown; the drone is then `Idle`.
    pub fn descend_step(&mut self, dt: f64) -> bool {
        self.status = DroneStatus::Landing;
        self.speed_mps = 0.0;
        self.velocity_mps = 0.0;

        let max_change = self.params.altitude_change_rate * dt;
        if self.altitude_m > max_change {
            self.altitude_m -= max_change;
            self.vertical_speed_mps = -self.params.altitude_change_rate;
            return false;
        }

        self.touch_down();
        true
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> Option<SimEvent> {
        let mut event = None;

        if self.may_retarget() && rng.random::<f64>() < self.params.retarget_probability {
            self.pick_random_target(rng);
            event = Some(SimEvent::Retargeted);
        }

        if self.distance_to_target_m() > self.params.arrival_threshold_m {
            self.advance_towards_target(dt, rng);
        } else if self.settle(dt) {
            event = Some(SimEvent::Arrived);
        }

        self.adjust_altitude(dt);
        self.drain_battery(dt);

        if self.battery_pct <= 0.0 {
            let was_moving = self.status != DroneStatus::Idle || self.speed_mps > 0.0;
            self.hold_position();
            self.status = DroneStatus::Idle;
            self.speed_mps = 0.0;
            self.velocity_mps = 0.0;
            if was_moving {
                event = Some(SimEvent::BatteryDepleted);
            }
        } else if self.battery_pct < self.params.low_battery_pct
            && self.status == DroneStatus::Flying
            && self.is_airborne()
        {
            // Descend in place
            self.hold_position();
            self.target_altitude_m = 0.0;
            self.status = DroneStatus::Landing;
            event = Some(SimEvent::LowBatteryLanding);
        }

        if self.status == DroneStatus::Landing && !self.is_airborne() {
            self.touch_down();
            event = Some(SimEvent::Touchdown);
        }

        self.heading_deg = normalize_heading(self.heading_deg);
        event
    }

    /// Snapshot of the current state.
    pub fn telemetry(&self, timestamp: DateTime<Utc>) -> Telemetry {
        let in_flight = matches!(self.status, DroneStatus::Flying | DroneStatus::Takeoff);
        let flight_time_remaining_s = if self.battery_pct > 0.0 && in_flight {
            let endurance = if self.velocity_mps > CRUISE_SPEED_THRESHOLD_MPS {
                MAX_FLIGHT_TIME_S
            } else {
                HOVER_FLIGHT_TIME_S
            };
            (self.battery_pct / 100.0) * endurance
        } else {
            0.0
        };

        Telemetry {
            drone_id: self.drone_id.clone(),
            lat: self.lat,
            lon: self.lon,
            altitude_m: self.altitude_m,
            heading_deg: self.heading_deg,
            velocity_mps: self.velocity_mps,
            battery_pct: self.battery_pct,
            status: self.status,
            timestamp,
            vertical_speed_mps: self.vertical_speed_mps,
            rtk_fix: self.rtk_fix,
            max_speed_mps: MAX_SPEED_MPS,
            max_altitude_m: MAX_ALTITUDE_M,
            flight_time_remaining_s,
        }
    }

    fn may_retarget(&self) -> bool {
        !matches!(self.status, DroneStatus::Landing)
            && self.battery_pct >= self.params.low_battery_pct
    }

    fn pick_random_target<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let range = self.params.retarget_range_deg;
        self.target_lat = self.lat + rng.random_range(-range..=range);
        self.target_lon = self.lon + rng.random_range(-range..=range);
        self.target_altitude_m = rng.random_range(
            self.params.retarget_altitude_min_m..=self.params.retarget_altitude_max_m,
        );
        self.status = DroneStatus::Flying;
        self.flight_start.get_or_insert_with(Utc::now);
    }

    fn advance_towards_target<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        let distance = self.distance_to_target_m();

        let target_heading = bearing_deg(self.lat, self.lon, self.target_lat, self.target_lon);
        let diff = heading_delta(self.heading_deg, target_heading);
        let max_turn = self.params.max_heading_change_deg;
        self.heading_deg = if diff.abs() > max_turn {
            normalize_heading(self.heading_deg + max_turn.copysign(diff))
        } else {
            target_heading
        };

        let target_speed = MAX_SPEED_MPS.min(distance / SPEED_DISTANCE_DIVISOR);
        self.speed_mps = if self.speed_mps < target_speed {
            target_speed.min(self.speed_mps + self.params.acceleration_rate * dt)
        } else {
            target_speed.max(self.speed_mps - self.params.deceleration_rate * dt)
        };
        self.velocity_mps = self.speed_mps;

        let step_deg = meters_to_flat_deg(self.speed_mps * dt);
        let heading_rad = self.heading_deg.to_radians();
        self.lat += heading_rad.cos() * step_deg;
        self.lon += heading_rad.sin() * step_deg;

        let jitter = meters_to_flat_deg(self.params.rtk_accuracy_m);
        if jitter > 0.0 {
            self.lat += rng.random_range(-jitter..=jitter);
            self.lon += rng.random_range(-jitter..=jitter);
        }
    }

    /// Slow down at the waypoint. Returns true when the drone just stopped.
    fn settle(&mut self, dt: f64) -> bool {
        if self.speed_mps > STOP_SPEED_MPS {
            self.speed_mps = (self.speed_mps - self.params.deceleration_rate * dt).max(0.0);
            self.velocity_mps = self.speed_mps;
            return false;
        }

        self.speed_mps = 0.0;
        self.velocity_mps = 0.0;
        if self.status == DroneStatus::Flying {
            self.status = DroneStatus::Idle;
            return true;
        }
        false
    }

    fn adjust_altitude(&mut self, dt: f64) {
        let before = self.altitude_m;
        let diff = self.target_altitude_m - self.altitude_m;
        let max_change = self.params.altitude_change_rate * dt;
        if diff.abs() > max_change {
            self.altitude_m += max_change.copysign(diff);
        } else {
            self.altitude_m = self.target_altitude_m;
        }
        self.altitude_m = self.altitude_m.clamp(0.0, MAX_ALTITUDE_M);
        self.vertical_speed_mps = if dt > 0.0 {
            (self.altitude_m - before) / dt
        } else {
            0.0
        };
    }

    fn drain_battery(&mut self, dt: f64) {
        let drain = match self.status {
            DroneStatus::Flying => {
                let rate = if self.velocity_mps > CRUISE_SPEED_THRESHOLD_MPS {
                    BATTERY_DRAIN_FLYING_PCT_S
                } else {
                    BATTERY_DRAIN_HOVER_PCT_S
                };
                rate * dt
            }
            DroneStatus::Idle => IDLE_SELF_DISCHARGE_PCT,
            _ => 0.0,
        };
        self.battery_pct = (self.battery_pct - drain).clamp(0.0, 100.0);
    }

    fn hold_position(&mut self) {
        self.target_lat = self.lat;
        self.target_lon = self.lon;
        self.target_altitude_m = self.altitude_m;
    }

    fn touch_down(&mut self) {
        self.altitude_m = 0.0;
        self.target_altitude_m = 0.0;
        self.vertical_speed_mps = 0.0;
        self.speed_mps = 0.0;
        self.velocity_mps = 0.0;
        self.status = DroneStatus::Idle;
    }
}
