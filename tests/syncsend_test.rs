// Test that the Vehicle and Mission objects can be sent between threads

use std::sync::Arc;
use std::thread::spawn;

use offboard_mission::sim::{SimConfig, SimulatedAutopilot};
use offboard_mission::{Mission, MissionConfig, Vehicle};

#[tokio::test]
async fn vehicle_can_be_sent_to_thread() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = Vehicle::from_link(Arc::new(SimulatedAutopilot::new(SimConfig::default())));

    let vehicle = spawn(move || vehicle).join().unwrap();
    vehicle.disconnect().await;

    Ok(())
}

#[tokio::test]
async fn mission_can_be_shared_between_threads() -> Result<(), Box<dyn std::error::Error>> {
    let mission = Arc::new(Mission::new(MissionConfig::default())?);

    let shared = mission.clone();
    let rate = spawn(move || shared.config().rate_hz).join().unwrap();
    assert_eq!(rate, 20.0);

    Ok(())
}
