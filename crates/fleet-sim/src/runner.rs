//! Per-drone update loop.
//!
//! Each simulated drone runs in its own tokio task: it arms, waits, climbs
//! to a takeoff altitude and then steps the kinematic simulator on a fixed
//! tick, publishing one telemetry record per tick. Stopping a drone lands
//! it before the task exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_core::{DroneSim, DroneStatus, SimError, SimEvent, Telemetry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::error::FleetError;
use crate::sink::TelemetrySink;

const COMMAND_QUEUE_CAPACITY: usize = 16;
const DEBUG_LOG_EVERY: u64 = 10;

/// Timing of a drone loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerParams {
    pub tick_interval: Duration,
    pub arm_delay: Duration,
    pub takeoff_altitude_min_m: f64,
    pub takeoff_altitude_max_m: f64,
    /// Seed for the drone's random source; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for RunnerParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RunnerParams {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            arm_delay: config.arm_delay(),
            takeoff_altitude_min_m: config.takeoff_altitude_min_m,
            takeoff_altitude_max_m: config.takeoff_altitude_max_m,
            seed: None,
        }
    }
}

/// Commands accepted by a running drone.
#[derive(Debug, Clone, PartialEq)]
pub enum DroneCommand {
    SetTarget { lat: f64, lon: f64, altitude_m: f64 },
}

/// Control handle for a running drone task.
pub struct DroneHandle {
    drone_id: String,
    commands: mpsc::Sender<DroneCommand>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Telemetry>,
}

impl DroneHandle {
    pub fn drone_id(&self) -> &str {
        &self.drone_id
    }

    /// Queue a new waypoint. Never waits on the drone loop.
    pub fn set_target(&self, lat: f64, lon: f64, altitude_m: f64) -> Result<(), FleetError> {
        if !(lat.is_finite() && lon.is_finite() && altitude_m.is_finite()) {
            return Err(SimError::InvalidWaypoint {
                lat,
                lon,
                altitude_m,
            }
            .into());
        }

        self.commands
            .try_send(DroneCommand::SetTarget {
                lat,
                lon,
                altitude_m,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    FleetError::CommandQueueFull(self.drone_id.clone())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    FleetError::DroneStopped(self.drone_id.clone())
                }
            })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop, wait for it to land and return the final record.
    pub async fn stop(self) -> Result<Telemetry, FleetError> {
        // The loop may already be gone; joining still yields its result
        let _ = self.stop_tx.send(true);
        self.task
            .await
            .map_err(|err| FleetError::TaskFailed(format!("{}: {}", self.drone_id, err)))
    }
}

/// Start the update loop for `sim` on the current tokio runtime.
pub fn spawn_drone(
    sim: DroneSim,
    sink: Arc<dyn TelemetrySink>,
    params: RunnerParams,
) -> DroneHandle {
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(false);
    let drone_id = sim.drone_id.clone();
    let task = tokio::spawn(run_drone(sim, sink, params, command_rx, stop_rx));

    DroneHandle {
        drone_id,
        commands,
        stop_tx,
        task,
    }
}

async fn run_drone(
    mut sim: DroneSim,
    sink: Arc<dyn TelemetrySink>,
    params: RunnerParams,
    mut commands: mpsc::Receiver<DroneCommand>,
    mut stop: watch::Receiver<bool>,
) -> Telemetry {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let dt = params.tick_interval.as_secs_f64();
    let takeoff_altitude_m = pick_takeoff_altitude(&params, &mut rng);

    tracing::info!(drone_id = %sim.drone_id, "Starting telemetry generator");
    emit(&sim, sink.as_ref());

    sim.arm();
    let takeoff_at = Instant::now() + params.arm_delay;

    let mut ticker = interval(params.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut iteration: u64 = 0;

    loop {
        tokio::select! {
            _ = stop.changed() => {
                tracing::info!(drone_id = %sim.drone_id, "Stop requested");
                break;
            }
            Some(command) = commands.recv() => {
                apply_command(&mut sim, command);
            }
            _ = ticker.tick() => {
                iteration += 1;
                if iteration % DEBUG_LOG_EVERY == 0 {
                    tracing::debug!(
                        drone_id = %sim.drone_id,
                        iteration,
                        status = %sim.status,
                        battery_pct = sim.battery_pct,
                        "Drone loop heartbeat"
                    );
                }

                match sim.status {
                    DroneStatus::Armed => {
                        if Instant::now() >= takeoff_at {
                            tracing::info!(drone_id = %sim.drone_id, takeoff_altitude_m, "Taking off");
                            sim.climb_step(dt, takeoff_altitude_m);
                        }
                    }
                    DroneStatus::Takeoff => {
                        if sim.climb_step(dt, takeoff_altitude_m) {
                            tracing::info!(drone_id = %sim.drone_id, "Takeoff complete");
                        }
                    }
                    _ => {
                        if let Some(event) = sim.step(dt, &mut rng) {
                            log_event(&sim, event);
                        }
                    }
                }

                emit(&sim, sink.as_ref());
            }
        }
    }

    land(&mut sim, sink.as_ref(), params.tick_interval).await
}

/// Descend at the configured rate until touchdown, publishing every tick.
async fn land(sim: &mut DroneSim, sink: &dyn TelemetrySink, tick_interval: Duration) -> Telemetry {
    let dt = tick_interval.as_secs_f64();
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if sim.is_airborne() {
        tracing::info!(drone_id = %sim.drone_id, altitude_m = sim.altitude_m, "Landing");
    }

    loop {
        ticker.tick().await;
        let landed = sim.descend_step(dt);
        emit(sim, sink);
        if landed {
            break;
        }
    }

    tracing::info!(drone_id = %sim.drone_id, battery_pct = sim.battery_pct, "Drone stopped");
    sim.telemetry(Utc::now())
}

fn apply_command(sim: &mut DroneSim, command: DroneCommand) {
    match command {
        DroneCommand::SetTarget {
            lat,
            lon,
            altitude_m,
        } => match sim.set_target(lat, lon, altitude_m) {
            Ok(()) => tracing::info!(
                drone_id = %sim.drone_id,
                lat,
                lon,
                altitude_m,
                "New target waypoint"
            ),
            Err(err) => tracing::warn!(drone_id = %sim.drone_id, "Ignoring command: {}", err),
        },
    }
}

fn pick_takeoff_altitude(params: &RunnerParams, rng: &mut StdRng) -> f64 {
    let min = params.takeoff_altitude_min_m.min(params.takeoff_altitude_max_m);
    let max = params.takeoff_altitude_min_m.max(params.takeoff_altitude_max_m);
    rng.random_range(min..=max)
}

fn emit(sim: &DroneSim, sink: &dyn TelemetrySink) {
    let telemetry = sim.telemetry(Utc::now());
    if let Err(err) = sink.publish(&telemetry) {
        tracing::warn!(drone_id = %sim.drone_id, "Telemetry sink failed: {}", err);
    }
}

fn log_event(sim: &DroneSim, event: SimEvent) {
    match event {
        SimEvent::Retargeted => tracing::debug!(
            drone_id = %sim.drone_id,
            target_lat = sim.target_lat,
            target_lon = sim.target_lon,
            target_altitude_m = sim.target_altitude_m,
            "Picked new waypoint"
        ),
        SimEvent::Arrived => tracing::debug!(drone_id = %sim.drone_id, "Waypoint reached"),
        SimEvent::LowBatteryLanding => tracing::warn!(
            drone_id = %sim.drone_id,
            battery_pct = sim.battery_pct,
            "Battery critically low, forcing landing"
        ),
        SimEvent::Touchdown => tracing::info!(drone_id = %sim.drone_id, "Touchdown"),
        SimEvent::BatteryDepleted => tracing::error!(
            drone_id = %sim.drone_id,
            altitude_m = sim.altitude_m,
            "Battery depleted, drone stopped"
        ),
    }
}
