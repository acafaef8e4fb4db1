//! # Position setpoint subsystem
//!
//! This subsystem sends local-frame position setpoints to the flight stack. Setpoints describe the instant target
//! position, so they need to be sent continuously for the autopilot to keep following them.
//!
//! Autopilots of the PX4 family have two safety mechanisms to be aware of:
//!  - The offboard mode is only accepted while a setpoint stream is already flowing. Setpoints must be sent for a
//!    while *before* requesting the mode.
//!  - If the stream stops while in offboard mode, the autopilot leaves offboard and falls back to a failsafe mode.
//!
//! Setpoints are queued and sent by a background task, so [Commander::setpoint_position()] never waits for the
//! link. The following example streams a hover setpoint at 20 Hz:
//! ``` no_run
//! # use tokio::time::{sleep, Duration};
//! # use offboard_mission::types::Pose;
//! # async fn hover(vehicle: offboard_mission::Vehicle) -> offboard_mission::Result<()> {
//! let hover = Pose::new(0.0, 0.0, 2.0);
//! for _ in 0..100 {
//!     vehicle.commander.setpoint_position(&hover).await?;
//!     sleep(Duration::from_millis(50)).await;
//! }
//! # Ok(())
//! # }
//! ```

use flume::Sender;

use crate::types::Pose;
use crate::Result;

/// # Position setpoint subsystem
///
/// See the [commander module documentation](crate::subsystems::commander) for more context and information.
#[derive(Debug)]
pub struct Commander {
    uplink: Sender<Pose>,
}

impl Commander {
    pub(crate) fn new(uplink: Sender<Pose>) -> Self {
        Self { uplink }
    }

    /// Sends an absolute position setpoint in the local frame.
    ///
    /// Returns [Error::Disconnected](crate::Error::Disconnected) once the vehicle has been disconnected.
    pub async fn setpoint_position(&self, setpoint: &Pose) -> Result<()> {
        self.uplink.send_async(*setpoint).await?;
        Ok(())
    }
}
