//! Fleet CLI - command line tools for the drone fleet simulator.
//!
//! Binaries:
//! - simulate_fleet: run simulated drones and stream telemetry as JSON lines
//! - plan_formation: print formation waypoints for a zone

use fleet_core::{Telemetry, ZoneBounds};
use fleet_sim::FleetManager;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` filter with a default directive per log target.
pub fn env_filter(default_directives: &[&str]) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for directive in default_directives {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for machine-readable output.
pub fn init_tracing(default_directives: &[&str], json: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(default_directives)?)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .try_init()?;

    Ok(())
}

/// Stop every drone while still consuming `telemetry_rx`, so landing and
/// final records are not dropped by a full channel.
///
/// Returns the final record of each drone.
pub async fn stop_fleet_streaming<F>(
    fleet: &FleetManager,
    telemetry_rx: &mut mpsc::Receiver<Telemetry>,
    mut on_record: F,
) -> anyhow::Result<Vec<Telemetry>>
where
    F: FnMut(&Telemetry) -> anyhow::Result<()>,
{
    let stopping = fleet.stop_all();
    tokio::pin!(stopping);

    let finals = loop {
        tokio::select! {
            finals = &mut stopping => break finals,
            Some(telemetry) = telemetry_rx.recv() => on_record(&telemetry)?,
        }
    };

    while let Ok(telemetry) = telemetry_rx.try_recv() {
        on_record(&telemetry)?;
    }
    Ok(finals)
}

/// Parse `north,south,east,west` into validated zone bounds.
pub fn parse_bounds(raw: &str) -> Result<ZoneBounds, String> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", raw, e))?;

    let [north, south, east, west] = parts[..] else {
        return Err(format!(
            "expected 4 values north,south,east,west, got {}",
            parts.len()
        ));
    };

    let bounds = ZoneBounds::new(north, south, east, west);
    bounds.validate().map_err(|e| e.to_string())?;
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::DroneStatus;
    use fleet_sim::{ChannelSink, Config, RunnerParams};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_parse_bounds() {
        let bounds = parse_bounds("20.98, 20.96, -89.58, -89.61").unwrap();
        assert_eq!(bounds.north, 20.98);
        assert_eq!(bounds.south, 20.96);
        assert_eq!(bounds.east, -89.58);
        assert_eq!(bounds.west, -89.61);
    }

    #[test]
    fn test_parse_bounds_rejects_bad_input() {
        assert!(parse_bounds("20.98,20.96,-89.58").is_err());
        assert!(parse_bounds("20.98,20.96,-89.58,abc").is_err());
        // south above north
        assert!(parse_bounds("20.96,20.98,-89.58,-89.61").is_err());
    }

    #[test]
    fn test_env_filter_covers_every_target() {
        let rendered = env_filter(&["simulate_fleet=info", "fleet_sim=info"])
            .unwrap()
            .to_string()
            .to_lowercase();
        assert!(rendered.contains("simulate_fleet=info"));
        assert!(rendered.contains("fleet_sim=info"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_streams_landing_through_small_channel() {
        const DRONES: usize = 4;

        let config = Config {
            max_drones: DRONES,
            tick_interval_ms: 100,
            arm_delay_ms: 200,
            takeoff_altitude_min_m: 1.0,
            takeoff_altitude_max_m: 1.0,
            ..Config::default()
        };
        let runner = RunnerParams {
            seed: Some(11),
            ..RunnerParams::from(&config)
        };
        let (home_lat, home_lon) = (config.home_lat, config.home_lon);
        let (sink, mut telemetry_rx) = ChannelSink::channel(16);
        let fleet = FleetManager::with_runner_params(config, runner, Arc::new(sink));

        let ids = fleet.start_drones(DRONES).unwrap();
        for id in &ids {
            fleet.set_target(id, home_lat, home_lon, 40.0).unwrap();
        }

        // Climb well above the channel's capacity in landing ticks
        tokio::time::sleep(Duration::from_secs(15)).await;
        while telemetry_rx.try_recv().is_ok() {}

        let mut landing_records = 0;
        let mut touched_down = HashSet::new();
        let finals = stop_fleet_streaming(&fleet, &mut telemetry_rx, |t| {
            if t.status == DroneStatus::Landing {
                landing_records += 1;
            }
            if t.status == DroneStatus::Idle && t.altitude_m == 0.0 {
                touched_down.insert(t.drone_id.clone());
            }
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(finals.len(), DRONES);
        assert!(landing_records > 16);
        let expected: HashSet<String> = ids.into_iter().collect();
        assert_eq!(touched_down, expected);
    }
}
