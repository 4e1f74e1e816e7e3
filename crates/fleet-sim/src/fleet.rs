//! Fleet manager: starts, commands and stops simulated drones.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use fleet_core::{formation, DroneSim, FormationKind, FormationWaypoint, Telemetry, Zone};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::error::FleetError;
use crate::runner::{spawn_drone, DroneHandle, RunnerParams};
use crate::sink::{FanoutSink, TelemetrySink};
use crate::state::FleetState;

/// Spacing of the initial layout grid (~100m).
pub const LAYOUT_SPACING_DEG: f64 = 0.001;

/// Identifier for the drone with the given sequence number.
pub fn generate_drone_id(index: usize) -> String {
    format!("DRONE_{:03}", index)
}

/// Start positions for a batch of `count` drones on a `ceil(sqrt(count))`
/// square grid.
///
/// Without `first_row` the grid is centered on the home position. Otherwise
/// its rows start `first_row` grid steps north of home. Also returns the row
/// just past the last one used, where the next batch can start.
pub fn layout_batch(
    home_lat: f64,
    home_lon: f64,
    count: usize,
    first_row: Option<f64>,
) -> (Vec<(f64, f64)>, f64) {
    let grid_size = ((count.max(1) as f64).sqrt().ceil()) as usize;
    let half = grid_size as f64 / 2.0;
    let row_base = first_row.unwrap_or(-half);

    let positions = (0..count)
        .map(|i| {
            let row = (i / grid_size) as f64;
            let col = (i % grid_size) as f64;
            (
                home_lat + (row_base + row) * LAYOUT_SPACING_DEG,
                home_lon + (col - half) * LAYOUT_SPACING_DEG,
            )
        })
        .collect();

    let rows_used = count.div_ceil(grid_size) as f64;
    (positions, row_base + rows_used)
}

/// Bookkeeping for drone creation, guarded by one lock so the limit check
/// and the inserts happen together.
#[derive(Debug, Default)]
struct Roster {
    next_index: usize,
    /// First free layout row north of the drones already placed
    next_row: Option<f64>,
}

pub struct FleetManager {
    config: Config,
    runner: RunnerParams,
    state: Arc<FleetState>,
    sink: Arc<dyn TelemetrySink>,
    drones: DashMap<String, DroneHandle>,
    roster: Mutex<Roster>,
}

impl FleetManager {
    /// Create a manager publishing to `sink`. Every record is also kept in
    /// the manager's [`FleetState`].
    pub fn new(config: Config, sink: Arc<dyn TelemetrySink>) -> Self {
        let runner = RunnerParams::from(&config);
        Self::with_runner_params(config, runner, sink)
    }

    pub fn with_runner_params(
        config: Config,
        runner: RunnerParams,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let state = Arc::new(FleetState::new());
        let fanout = FanoutSink::new().with(state.clone()).with(sink);
        Self {
            config,
            runner,
            state,
            sink: Arc::new(fanout),
            drones: DashMap::new(),
            roster: Mutex::new(Roster::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> Arc<FleetState> {
        self.state.clone()
    }

    /// Start `count` drones around the home position and return their ids.
    ///
    /// Batches started after the first are placed north of the earlier ones.
    pub fn start_drones(&self, count: usize) -> Result<Vec<String>, FleetError> {
        let mut roster = self
            .roster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let active = self.drones.len();
        if active + count > self.config.max_drones {
            return Err(FleetError::TooManyDrones {
                requested: count,
                active,
                max: self.config.max_drones,
            });
        }

        tracing::info!("Starting {} simulated drone(s)", count);

        let mut seed_rng = match self.runner.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (positions, next_row) = layout_batch(
            self.config.home_lat,
            self.config.home_lon,
            count,
            roster.next_row,
        );

        let mut started = Vec::with_capacity(count);
        for (lat, lon) in positions {
            let index = roster.next_index;
            roster.next_index += 1;
            let drone_id = generate_drone_id(index);

            tracing::info!("Creating drone {} at ({:.6}, {:.6})", drone_id, lat, lon);

            let sim = DroneSim::new(drone_id.clone(), lat, lon, &mut seed_rng);
            let params = RunnerParams {
                seed: self.runner.seed.map(|seed| seed.wrapping_add(index as u64)),
                ..self.runner.clone()
            };
            let handle = spawn_drone(sim, self.sink.clone(), params);
            self.drones.insert(drone_id.clone(), handle);
            started.push(drone_id);
        }
        if count > 0 {
            roster.next_row = Some(next_row);
        }

        Ok(started)
    }

    /// Ids of the running drones, sorted.
    pub fn drone_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drones.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn drone_count(&self) -> usize {
        self.drones.len()
    }

    /// Send a new waypoint to one drone.
    pub fn set_target(
        &self,
        drone_id: &str,
        lat: f64,
        lon: f64,
        altitude_m: f64,
    ) -> Result<(), FleetError> {
        let handle = self
            .drones
            .get(drone_id)
            .ok_or_else(|| FleetError::UnknownDrone(drone_id.to_string()))?;
        handle.set_target(lat, lon, altitude_m)
    }

    /// Register an operator zone; it becomes the active zone.
    pub fn add_zone(&self, zone: Zone) -> bool {
        self.state.add_zone(zone)
    }

    /// Lay the running drones out over a zone and dispatch their waypoints.
    pub fn apply_formation(
        &self,
        zone_id: &str,
        kind: FormationKind,
    ) -> Result<Vec<FormationWaypoint>, FleetError> {
        let zone = self
            .state
            .zone(zone_id)
            .ok_or_else(|| FleetError::UnknownZone(zone_id.to_string()))?;
        self.dispatch_formation(&zone, kind)
    }

    /// [`Self::apply_formation`] on the active zone.
    pub fn apply_formation_to_active(
        &self,
        kind: FormationKind,
    ) -> Result<Vec<FormationWaypoint>, FleetError> {
        let zone = self.state.active_zone().ok_or(FleetError::NoActiveZone)?;
        self.dispatch_formation(&zone, kind)
    }

    /// Every drone is tried even if an earlier one fails; failures are
    /// reported together.
    fn dispatch_formation(
        &self,
        zone: &Zone,
        kind: FormationKind,
    ) -> Result<Vec<FormationWaypoint>, FleetError> {
        let drone_ids = self.drone_ids();
        let waypoints = formation::calculate_for_zone(zone, kind, &drone_ids);

        tracing::info!(
            zone_id = %zone.id,
            formation = %kind,
            drones = waypoints.len(),
            "Applying formation"
        );

        let mut failed = Vec::new();
        for wp in &waypoints {
            if let Err(err) = self.set_target(&wp.drone_id, wp.lat, wp.lon, wp.altitude_m) {
                tracing::warn!(drone_id = %wp.drone_id, "Formation waypoint not sent: {}", err);
                failed.push(format!("{}: {}", wp.drone_id, err));
            }
        }

        if failed.is_empty() {
            Ok(waypoints)
        } else {
            Err(FleetError::PartialFormation {
                dispatched: waypoints.len() - failed.len(),
                failed,
            })
        }
    }

    /// Stop one drone, wait for it to land and forget it.
    pub async fn stop_drone(&self, drone_id: &str) -> Result<Telemetry, FleetError> {
        let (_, handle) = self
            .drones
            .remove(drone_id)
            .ok_or_else(|| FleetError::UnknownDrone(drone_id.to_string()))?;
        let final_telemetry = handle.stop().await;
        self.state.remove_drone(drone_id);
        final_telemetry
    }

    /// Stop every drone concurrently. Returns the final record of each
    /// drone that landed cleanly.
    pub async fn stop_all(&self) -> Vec<Telemetry> {
        let ids = self.drone_ids();
        let handles: Vec<DroneHandle> = ids
            .iter()
            .filter_map(|id| self.drones.remove(id).map(|(_, handle)| handle))
            .collect();

        tracing::info!("Stopping {} drone(s)", handles.len());

        let results = join_all(handles.into_iter().map(|handle| handle.stop())).await;
        let mut finals = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(telemetry) => {
                    self.state.remove_drone(&telemetry.drone_id);
                    finals.push(telemetry);
                }
                Err(err) => tracing::error!("Failed to stop drone: {}", err),
            }
        }
        finals
    }
}
