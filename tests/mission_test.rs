// Full missions flown against the simulated autopilot on a paused clock

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use offboard_mission::mission::trajectory::{lemniscate, loop_duration};
use offboard_mission::sim::{SimCommand, SimConfig, SimulatedAutopilot};
use offboard_mission::types::{Pose, MODE_AUTO_LAND, MODE_OFFBOARD};
use offboard_mission::{Mission, MissionConfig, MissionEvent, MissionPhase, MissionReport, Vehicle};
use tokio::time::{sleep, Instant};

struct Flight {
    sim: Arc<SimulatedAutopilot>,
    report: MissionReport,
    events: Vec<MissionEvent>,
}

impl Flight {
    fn phase_start(&self, phase: MissionPhase) -> Instant {
        self.events
            .iter()
            .find_map(|event| match event {
                MissionEvent::PhaseChanged { at, to, .. } if *to == phase => Some(*at),
                _ => None,
            })
            .unwrap_or_else(|| panic!("phase {} never started", phase))
    }

    fn transitions(&self) -> Vec<(MissionPhase, MissionPhase)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MissionEvent::PhaseChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fly until `stop_after` has elapsed, or until the mission is complete if `None`
async fn fly(sim_config: SimConfig, stop_after: Option<Duration>) -> Flight {
    init_logger();

    let sim = Arc::new(SimulatedAutopilot::new(sim_config));
    let vehicle = Vehicle::from_link(sim.clone());

    let config = MissionConfig {
        exit_on_complete: stop_after.is_none(),
        ..Default::default()
    };
    let mission = Mission::new(config).unwrap();
    let mut events = mission.subscribe();

    let stop = Arc::new(AtomicBool::new(false));
    if let Some(stop_after) = stop_after {
        let stop = stop.clone();
        tokio::spawn(async move {
            sleep(stop_after).await;
            stop.store(true, Relaxed);
        });
    }

    let report = mission.run(&vehicle, &stop).await.unwrap();
    vehicle.disconnect().await;

    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }

    Flight {
        sim,
        report,
        events: collected,
    }
}

#[tokio::test(start_paused = true)]
async fn mission_goes_through_every_phase_in_order() {
    let flight = fly(SimConfig::default(), None).await;

    assert_eq!(flight.report.phase, MissionPhase::Complete);
    assert_eq!(
        flight.transitions(),
        vec![
            (MissionPhase::Takeoff, MissionPhase::Figure8),
            (MissionPhase::Figure8, MissionPhase::Land),
            (MissionPhase::Land, MissionPhase::Complete),
        ]
    );

    let land_requests: Vec<_> = flight
        .sim
        .commands()
        .into_iter()
        .filter(|record| record.command == SimCommand::SetMode(MODE_AUTO_LAND.to_owned()))
        .collect();
    assert_eq!(land_requests.len(), 1);
    assert!(land_requests[0].accepted);
    assert_eq!(flight.sim.status().mode, MODE_AUTO_LAND);
}

#[tokio::test(start_paused = true)]
async fn warm_up_streams_before_any_command() {
    let flight = fly(SimConfig::default(), None).await;
    let setpoints = flight.sim.setpoints();
    let commands = flight.sim.commands();

    for setpoint in &setpoints[..100] {
        assert_eq!(setpoint.pose, Pose::new(0.0, 0.0, 6.0));
    }
    assert!(commands[0].at >= setpoints[99].at + Duration::from_secs(5));
    assert_eq!(commands[0].command, SimCommand::SetMode(MODE_OFFBOARD.to_owned()));
    assert!(flight.report.setpoints_published >= 100);
}

#[tokio::test(start_paused = true)]
async fn takeoff_holds_the_takeoff_point() {
    let flight = fly(SimConfig::default(), None).await;
    let figure8_start = flight.phase_start(MissionPhase::Figure8);

    let takeoff: Vec<_> = flight
        .sim
        .setpoints()
        .into_iter()
        .filter(|setpoint| setpoint.at <= figure8_start)
        .collect();

    assert!(!takeoff.is_empty());
    for setpoint in takeoff {
        assert_eq!(setpoint.pose, Pose::new(0.0, 0.0, 6.0));
    }
}

#[tokio::test(start_paused = true)]
async fn figure8_lasts_exactly_one_loop() {
    let flight = fly(SimConfig::default(), None).await;

    let duration = flight.phase_start(MissionPhase::Land) - flight.phase_start(MissionPhase::Figure8);
    let expected = loop_duration(0.3);

    assert!((expected.as_secs_f64() - 20.944).abs() < 1e-3);
    assert!(duration >= expected, "figure-8 too short: {:?}", duration);
    assert!(
        duration <= expected + Duration::from_millis(50),
        "figure-8 too long: {:?}",
        duration
    );
}

#[tokio::test(start_paused = true)]
async fn figure8_setpoints_follow_the_lemniscate() {
    let flight = fly(SimConfig::default(), None).await;
    let figure8_start = flight.phase_start(MissionPhase::Figure8);
    let land_start = flight.phase_start(MissionPhase::Land);

    let figure8: Vec<_> = flight
        .sim
        .setpoints()
        .into_iter()
        .filter(|setpoint| setpoint.at >= figure8_start && setpoint.at < land_start)
        .collect();
    assert!(figure8.len() > 400);

    for setpoint in &figure8 {
        let t = (setpoint.at - figure8_start).as_secs_f64();
        let expected = lemniscate(15.0, 0.3, 6.0, t);

        assert!((setpoint.pose.x - expected.x).abs() < 1e-6);
        assert!((setpoint.pose.y - expected.y).abs() < 1e-6);
        assert!((setpoint.pose.z - 6.0).abs() < 1e-6);
        assert!(setpoint.pose.x.abs() <= 15.0 + 1e-9);
        assert!(setpoint.pose.y.abs() <= 7.5 + 1e-9);
    }

    let at_five_seconds = figure8
        .iter()
        .find(|setpoint| setpoint.at >= figure8_start + Duration::from_secs(5))
        .unwrap();
    assert!((at_five_seconds.pose.x - 14.96).abs() < 0.1);
    assert!((at_five_seconds.pose.y - 1.06).abs() < 0.1);
}

#[tokio::test(start_paused = true)]
async fn no_setpoint_after_landing_starts() {
    // Keep running well after completion to make sure the stream stays stopped
    let flight = fly(SimConfig::default(), Some(Duration::from_secs(90))).await;
    let land_start = flight.phase_start(MissionPhase::Land);

    assert_eq!(flight.report.phase, MissionPhase::Complete);
    assert!(flight.report.elapsed > Duration::from_secs(70));
    assert_eq!(
        flight
            .sim
            .setpoints()
            .iter()
            .filter(|setpoint| setpoint.at >= land_start)
            .count(),
        0
    );

    // Landed and disarmed by the autopilot
    assert!(!flight.sim.status().armed);
    assert_eq!(flight.sim.status().mode, MODE_AUTO_LAND);
    assert_eq!(flight.sim.position().z, 0.0);
}

#[tokio::test(start_paused = true)]
async fn landing_is_not_taken_back_by_offboard() {
    let flight = fly(SimConfig::default(), Some(Duration::from_secs(90))).await;
    let commands = flight.sim.commands();

    let land = commands
        .iter()
        .position(|record| record.command == SimCommand::SetMode(MODE_AUTO_LAND.to_owned()))
        .unwrap();
    assert!(commands[land].accepted);

    let after_land = &commands[land + 1..];
    assert!(!after_land.is_empty());
    for record in after_land {
        assert_eq!(record.command, SimCommand::SetMode(MODE_OFFBOARD.to_owned()));
        assert!(!record.accepted, "offboard accepted during landing: {:?}", record);
        assert!(record.at - commands[land].at >= Duration::from_secs(5));
    }

    assert!(!flight.sim.status().armed);
    assert_eq!(flight.sim.position().z, 0.0);
}

#[tokio::test(start_paused = true)]
async fn refused_land_is_not_retried() {
    let sim_config = SimConfig {
        land_rejections: 1,
        ..Default::default()
    };
    let flight = fly(sim_config, Some(Duration::from_secs(90))).await;
    let land_start = flight.phase_start(MissionPhase::Land);

    let land_requests: Vec<_> = flight
        .sim
        .commands()
        .into_iter()
        .filter(|record| record.command == SimCommand::SetMode(MODE_AUTO_LAND.to_owned()))
        .collect();
    assert_eq!(land_requests.len(), 1);
    assert!(!land_requests[0].accepted);

    let land_events: Vec<_> = flight
        .events
        .iter()
        .filter(|event| matches!(event, MissionEvent::LandRequested { .. }))
        .collect();
    assert_eq!(land_events.len(), 1);
    assert!(matches!(land_events[0], MissionEvent::LandRequested { accepted: false, .. }));

    assert_eq!(flight.report.phase, MissionPhase::Complete);
    assert_eq!(
        flight.transitions().last(),
        Some(&(MissionPhase::Land, MissionPhase::Complete))
    );
    assert!(flight.sim.setpoints().iter().all(|setpoint| setpoint.at < land_start));
}

#[tokio::test(start_paused = true)]
async fn commands_are_spaced_by_the_cooldown() {
    let sim_config = SimConfig {
        offboard_rejections: 2,
        arm_rejections: 2,
        ..Default::default()
    };
    let flight = fly(sim_config, Some(Duration::from_secs(120))).await;
    let commands: Vec<_> = flight
        .sim
        .commands()
        .into_iter()
        .filter(|record| record.command != SimCommand::SetMode(MODE_AUTO_LAND.to_owned()))
        .collect();

    for pair in commands.windows(2) {
        assert!(
            pair[1].at - pair[0].at >= Duration::from_secs(5),
            "commands {:?} and {:?} too close",
            pair[0],
            pair[1]
        );
    }

    let offboard: Vec<_> = commands
        .iter()
        .take_while(|record| !record.accepted)
        .collect();
    assert_eq!(offboard.len(), 2);
    assert!(commands[2].accepted);

    let arming: Vec<_> = commands
        .iter()
        .filter(|record| record.command == SimCommand::Arm(true))
        .collect();
    assert_eq!(arming.len(), 3);
    assert!(arming[2].accepted);

    assert_eq!(flight.report.phase, MissionPhase::Complete);
    let offboard_events = flight
        .events
        .iter()
        .filter(|event| matches!(event, MissionEvent::OffboardRequested { .. }))
        .count();
    assert!(offboard_events >= 3);
}

#[tokio::test(start_paused = true)]
async fn stop_before_connection_ends_the_run() {
    let sim_config = SimConfig {
        connect_delay: Duration::from_secs(3600),
        ..Default::default()
    };
    let flight = fly(sim_config, Some(Duration::from_secs(2))).await;

    assert_eq!(
        flight.report,
        MissionReport {
            phase: MissionPhase::Takeoff,
            setpoints_published: 0,
            elapsed: Duration::ZERO,
        }
    );
    assert!(flight.sim.setpoints().is_empty());
    assert!(flight.sim.commands().is_empty());
    assert!(flight.events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn link_loss_does_not_end_the_run() {
    init_logger();

    let sim = Arc::new(SimulatedAutopilot::new(SimConfig::default()));
    let vehicle = Vehicle::from_link(sim.clone());
    let mission = Mission::new(MissionConfig::default()).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let closed_at = Instant::now() + Duration::from_secs(20);

    {
        let sim = sim.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(20)).await;
            sim.close();
            sleep(Duration::from_secs(20)).await;
            stop.store(true, Relaxed);
        });
    }

    let report = mission.run(&vehicle, &stop).await.unwrap();

    assert!(!vehicle.supervisor.is_connected());
    assert!(report.phase < MissionPhase::Land);
    assert!(!sim.setpoints().is_empty());
    assert!(sim.setpoints().iter().all(|setpoint| setpoint.at <= closed_at));

    vehicle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn supervisor_reports_connection() {
    init_logger();

    let sim = Arc::new(SimulatedAutopilot::new(SimConfig::default()));
    let vehicle = Vehicle::from_link(sim.clone());
    assert!(!vehicle.supervisor.is_connected());

    let status = vehicle.supervisor.wait_connected().await.unwrap();
    assert!(status.connected);
    assert!(!status.armed);

    let stream = vehicle.supervisor.status_stream();
    futures::pin_mut!(stream);
    let next = stream.next().await.unwrap();
    assert!(next.connected);

    vehicle.disconnect().await;
    assert!(!vehicle.supervisor.is_connected());
    assert!(vehicle.commander.setpoint_position(&Pose::default()).await.is_err());
}
