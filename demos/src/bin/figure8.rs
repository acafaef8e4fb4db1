// Fly the figure-8 mission against the simulated autopilot
//
// Usage: figure8 [config.json]
//
// The optional JSON file overrides any field of the mission configuration, for example:
//   { "radius": 5.0, "angular_speed": 0.5, "exit_on_complete": true }
// Set RUST_LOG=info to follow the mission. Ctrl-C stops the mission loop.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use futures::StreamExt;
use offboard_mission::sim::{SimConfig, SimulatedAutopilot};
use offboard_mission::{Mission, MissionConfig, Vehicle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => MissionConfig::from_file(path)?,
        None => MissionConfig {
            exit_on_complete: true,
            ..Default::default()
        },
    };

    let sim = Arc::new(SimulatedAutopilot::new(SimConfig::default()));
    let vehicle = Arc::new(Vehicle::from_link(sim.clone()));

    // Print every arming or mode change reported by the autopilot
    let watcher = vehicle.clone();
    tokio::spawn(async move {
        let mut previous = watcher.supervisor.status();
        let stream = watcher.supervisor.status_stream();
        futures::pin_mut!(stream);
        while let Some(status) = stream.next().await {
            if status.armed != previous.armed || status.mode != previous.mode {
                println!("Autopilot: armed={} mode={}", status.armed, status.mode);
            }
            previous = status;
        }
    });

    let stop = Arc::new(AtomicBool::new(false));
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received, stopping");
            ctrl_c.store(true, Relaxed);
        }
    });

    let mission = Mission::new(config)?;
    let report = mission.run(&vehicle, &stop).await?;

    println!(
        "Mission stopped in phase {} after {:.1} s, {} setpoints sent",
        report.phase,
        report.elapsed.as_secs_f64(),
        report.setpoints_published
    );
    let position = sim.position();
    println!(
        "Vehicle position: ({:.2}, {:.2}, {:.2})",
        position.x, position.y, position.z
    );

    vehicle.disconnect().await;
    Ok(())
}
