//! Run a simulated drone fleet and stream its telemetry.
//!
//! Every telemetry record is printed to stdout as one JSON object per line.
//! Optionally lays the fleet out over a zone after a delay.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fleet_cli::{init_tracing, parse_bounds, stop_fleet_streaming};
use fleet_core::{FormationKind, Telemetry, Zone, ZoneBounds};
use fleet_sim::{ChannelSink, Config, FleetManager, RunnerParams};
use tokio::time;

const TELEMETRY_BUFFER: usize = 1024;

/// Simulate a drone fleet and print telemetry as JSON lines
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (defaults to FLEET_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of drones (overrides config)
    #[arg(long)]
    drones: Option<usize>,

    /// Simulation tick in milliseconds (overrides config)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Duration in seconds
    #[arg(long, default_value_t = 30)]
    duration: u64,

    /// Zone as north,south,east,west; enables the formation
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    zone: Option<ZoneBounds>,

    /// Formation applied to the zone
    #[arg(long, default_value = "grid")]
    formation: FormationKind,

    /// Seconds to wait before applying the formation
    #[arg(long, default_value_t = 5)]
    formation_after: u64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&["simulate_fleet=info", "fleet_sim=info"], args.log_json)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::from_env(),
    };
    if let Some(drones) = args.drones {
        config.drone_count = drones;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }

    let runner = RunnerParams {
        seed: args.seed,
        ..RunnerParams::from(&config)
    };
    let (sink, mut telemetry_rx) = ChannelSink::channel(TELEMETRY_BUFFER);
    let fleet = FleetManager::with_runner_params(config.clone(), runner, Arc::new(sink));

    let zone_id = match args.zone {
        Some(bounds) => {
            let zone = Zone::new(bounds)?;
            let zone_id = zone.id.clone();
            tracing::info!(
                zone_id = %zone_id,
                area_km2 = bounds.area_km2(),
                "Registered zone"
            );
            fleet.add_zone(zone);
            Some(zone_id)
        }
        None => None,
    };

    let ids = fleet.start_drones(config.drone_count)?;
    tracing::info!("Started {} drone(s): {}", ids.len(), ids.join(", "));

    let deadline = time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);
    let formation_timer = time::sleep(Duration::from_secs(args.formation_after));
    tokio::pin!(formation_timer);
    let mut formation_pending = zone_id.is_some();

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::info!("Simulation time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            _ = &mut formation_timer, if formation_pending => {
                formation_pending = false;
                if let Some(zone_id) = &zone_id {
                    match fleet.apply_formation(zone_id, args.formation) {
                        Ok(waypoints) => tracing::info!(
                            "Applied {} formation to {} drone(s)",
                            args.formation,
                            waypoints.len()
                        ),
                        Err(e) => tracing::warn!("Formation failed: {}", e),
                    }
                }
            }
            Some(telemetry) = telemetry_rx.recv() => {
                print_telemetry(&telemetry)?;
            }
        }
    }

    let finals = stop_fleet_streaming(&fleet, &mut telemetry_rx, print_telemetry).await?;

    for t in &finals {
        tracing::info!(
            drone_id = %t.drone_id,
            battery_pct = t.battery_pct,
            "Final state: {}",
            t.status
        );
    }
    tracing::info!(
        "Simulation complete, {} records produced",
        fleet.state().update_count()
    );

    Ok(())
}

fn print_telemetry(telemetry: &Telemetry) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(telemetry)?);
    Ok(())
}
