//! # Offboard figure-8 mission
//!
//! This crate flies a multicopter through a fixed mission by streaming position setpoints to an autopilot of the
//! PX4 family: climb to a takeoff altitude, fly one figure-8 (a Lemniscate of Gerono), then hand over to the
//! autopilot landing mode.
//!
//! The autopilot is reached through a [FlightLink]: any publish/subscribe middleware able to deliver telemetry,
//! accept setpoints and answer mode and arming requests can implement it. A [SimulatedAutopilot](sim::SimulatedAutopilot)
//! is provided to run the mission without hardware.
//!
//! ## Usage
//!
//! The basic procedure to use the lib is:
//!  - Open a link to the flight stack and wrap it in an `Arc`
//!  - Create a [Vehicle] from the link, this starts the background tasks moving telemetry and setpoints
//!  - Subsystems are available as public fields of the [Vehicle] struct
//!  - Create a [Mission] from a [MissionConfig] and run it on the vehicle
//!  - Drop the [Vehicle] object or call [Vehicle::disconnect()]
//!
//! For example, flying the mission against the simulated autopilot:
//! ``` no_run
//! # async fn fly() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use offboard_mission::sim::{SimConfig, SimulatedAutopilot};
//! use offboard_mission::{Mission, MissionConfig, Vehicle};
//!
//! let vehicle = Vehicle::from_link(Arc::new(SimulatedAutopilot::new(SimConfig::default())));
//!
//! let config = MissionConfig { exit_on_complete: true, ..Default::default() };
//! let mission = Mission::new(config)?;
//! let report = mission.run(&vehicle, &AtomicBool::new(false)).await?;
//! println!("Mission ended in phase {} after {:?}", report.phase, report.elapsed);
//!
//! vehicle.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [log](https://crates.io/crates/log) facade, install a logger such as `env_logger` to
//! see the mission progress.

#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
mod link;
mod vehicle;

pub mod mission;
pub mod sim;
pub mod subsystems;
pub mod types;

pub use crate::config::MissionConfig;
pub use crate::error::{Error, Result};
pub use crate::link::FlightLink;
pub use crate::mission::{Mission, MissionEvent, MissionPhase, MissionReport};
pub use crate::vehicle::Vehicle;
