//! Drone loop tests on a paused tokio clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{DroneSim, DroneStatus, Telemetry};
use fleet_sim::{spawn_drone, ChannelSink, FleetError, RunnerParams, SinkError};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fast_params() -> RunnerParams {
    RunnerParams {
        tick_interval: Duration::from_millis(100),
        arm_delay: Duration::from_millis(200),
        takeoff_altitude_min_m: 1.0,
        takeoff_altitude_max_m: 1.0,
        seed: Some(42),
    }
}

fn make_sim(drone_id: &str) -> DroneSim {
    let mut rng = StdRng::seed_from_u64(1);
    DroneSim::new(drone_id, 20.9674, -89.5926, &mut rng)
}

#[tokio::test(start_paused = true)]
async fn test_first_record_is_emitted_before_arming() {
    let (sink, mut rx) = ChannelSink::channel(1024);
    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());

    let first = rx.recv().await.unwrap();
    assert_eq!(first.drone_id, "DRONE_000");
    assert_eq!(first.status, DroneStatus::Idle);
    assert_eq!(first.altitude_m, 0.0);
    assert_eq!(first.battery_pct, 100.0);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_drone_arms_takes_off_and_flies() {
    let (sink, mut rx) = ChannelSink::channel(1024);
    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());

    let mut statuses = Vec::new();
    let mut last: Option<Telemetry> = None;
    for _ in 0..100 {
        let t = rx.recv().await.unwrap();
        let status = t.status;
        if statuses.last() != Some(&status) {
            statuses.push(status);
        }
        last = Some(t);
        if status == DroneStatus::Flying {
            break;
        }
    }

    assert_eq!(
        statuses,
        vec![
            DroneStatus::Idle,
            DroneStatus::Armed,
            DroneStatus::Takeoff,
            DroneStatus::Flying
        ]
    );
    let last = last.unwrap();
    assert!((last.altitude_m - 1.0).abs() < 1e-9);
    assert!(last.flight_time_remaining_s > 0.0);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_lands_the_drone() {
    let (sink, mut rx) = ChannelSink::channel(4096);
    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());

    loop {
        let t = rx.recv().await.unwrap();
        if t.status == DroneStatus::Flying {
            break;
        }
    }

    let final_telemetry = handle.stop().await.unwrap();
    assert_eq!(final_telemetry.status, DroneStatus::Idle);
    assert_eq!(final_telemetry.altitude_m, 0.0);
    assert_eq!(final_telemetry.velocity_mps, 0.0);

    let mut saw_landing = false;
    let mut last = None;
    while let Ok(t) = rx.try_recv() {
        saw_landing |= t.status == DroneStatus::Landing;
        last = Some(t);
    }
    assert!(saw_landing);
    let last = last.unwrap();
    assert_eq!(last.status, DroneStatus::Idle);
    assert_eq!(last.altitude_m, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_sink_does_not_stop_the_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let sink = move |_: &Telemetry| -> Result<(), SinkError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Rejected("unavailable".to_string()))
    };

    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(calls.load(Ordering::SeqCst) >= 5);
    assert!(!handle.is_finished());

    let final_telemetry = handle.stop().await.unwrap();
    assert_eq!(final_telemetry.status, DroneStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_set_target_is_applied_by_the_loop() {
    let (sink, mut rx) = ChannelSink::channel(4096);
    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());

    handle.set_target(20.9680, -89.5926, 40.0).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut climbed = false;
    while let Ok(t) = rx.try_recv() {
        climbed |= t.altitude_m > 1.0;
    }
    assert!(climbed);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_set_target_rejects_non_finite_waypoints() {
    let (sink, _rx) = ChannelSink::channel(1024);
    let handle = spawn_drone(make_sim("DRONE_000"), Arc::new(sink), fast_params());

    let err = handle.set_target(f64::NAN, -89.5926, 40.0).unwrap_err();
    assert!(matches!(err, FleetError::InvalidWaypoint(_)));

    handle.stop().await.unwrap();
}
