//! # Supervisor subsystem
//!
//! The supervisor tracks the vehicle state reported by the flight stack and sends the state-changing commands:
//! - Link state (is the autopilot connected)
//! - Arming state
//! - Flight mode
//!
//! ## Reading the vehicle state
//!
//! The state is a snapshot of the last status update received, reading it never waits:
//! ``` no_run
//! # fn read_state(vehicle: &offboard_mission::Vehicle) {
//! let status = vehicle.supervisor.status();
//! if status.armed {
//!     println!("Vehicle is armed, mode {}", status.mode);
//! }
//! # }
//! ```
//!
//! ## Sending commands
//!
//! Commands are request/response. A command refused by the autopilot returns `Ok(false)`, an error means the
//! request could not be delivered:
//! ``` no_run
//! # async fn send_commands(vehicle: &offboard_mission::Vehicle) -> offboard_mission::Result<()> {
//! if !vehicle.supervisor.set_mode("OFFBOARD").await? {
//!     println!("Offboard mode refused");
//! }
//! vehicle.supervisor.send_arming_request(true).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use crate::link::FlightLink;
use crate::types::VehicleStatus;
use crate::Result;

/// # Access to the supervisor subsystem
///
/// See the [supervisor module documentation](crate::subsystems::supervisor) for more context and information.
pub struct Supervisor {
    link: Arc<dyn FlightLink>,
    status: watch::Receiver<VehicleStatus>,
}

impl Supervisor {
    pub(crate) fn new(link: Arc<dyn FlightLink>, status: watch::Receiver<VehicleStatus>) -> Self {
        Self { link, status }
    }

    /// Latest status received from the flight stack
    pub fn status(&self) -> VehicleStatus {
        self.status.borrow().clone()
    }

    /// True if the last status update reported a connected autopilot
    pub fn is_connected(&self) -> bool {
        self.status.borrow().connected
    }

    /// Wait until the flight stack reports a connected autopilot
    ///
    /// Returns [Error::Disconnected](crate::Error::Disconnected) if the telemetry dispatcher stops first.
    pub async fn wait_connected(&self) -> Result<VehicleStatus> {
        let mut status = self.status.clone();
        let connected = status.wait_for(|s| s.connected).await?;

        Ok(connected.clone())
    }

    /// Stream of status updates
    ///
    /// Yields each new status as it is received, starting with the next update. The stream ends when the telemetry
    /// dispatcher stops.
    pub fn status_stream(&self) -> impl Stream<Item = VehicleStatus> {
        let mut status = self.status.clone();
        status.mark_unchanged();

        async_stream::stream! {
            while status.changed().await.is_ok() {
                let update = status.borrow_and_update().clone();
                yield update;
            }
        }
    }

    /// Request a flight mode change
    ///
    /// Returns `Ok(true)` if the autopilot accepted the new mode.
    pub async fn set_mode(&self, mode: &str) -> Result<bool> {
        self.link.set_mode(mode).await
    }

    /// Send system arm/disarm request
    ///
    /// # Arguments
    /// * `do_arm` - true to arm, false to disarm
    ///
    /// Returns `Ok(true)` if the autopilot reported success.
    pub async fn send_arming_request(&self, do_arm: bool) -> Result<bool> {
        self.link.arm(do_arm).await
    }
}
