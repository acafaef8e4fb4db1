//! # Flight stack link
//!
//! The flight stack (autopilot plus its middleware) is reached through a [FlightLink]. It plays the part of the
//! radio link in a direct-to-vehicle library: it carries telemetry down, setpoints up, and answers two
//! request/response commands. Connection handshake, retries at the transport level and wire encoding all belong
//! to the implementation of this trait.

use async_trait::async_trait;

use crate::types::{Pose, TelemetryUpdate};
use crate::Result;

/// Connection to an external flight stack
///
/// Implementations must be usable from several tasks at once: the [Vehicle](crate::Vehicle) reads telemetry from
/// one task and publishes setpoints from another while the mission issues commands.
#[async_trait]
pub trait FlightLink: Send + Sync {
    /// Wait for the next telemetry update
    ///
    /// Returns [Error::Disconnected](crate::Error::Disconnected) once the link is closed.
    async fn recv_telemetry(&self) -> Result<TelemetryUpdate>;

    /// Publish a local-frame position setpoint
    async fn publish_setpoint(&self, setpoint: &Pose) -> Result<()>;

    /// Request a flight mode change
    ///
    /// Returns `Ok(true)` if the autopilot accepted the mode.
    async fn set_mode(&self, mode: &str) -> Result<bool>;

    /// Request arming (`true`) or disarming (`false`)
    ///
    /// Returns `Ok(true)` if the autopilot reported success.
    async fn arm(&self, value: bool) -> Result<bool>;
}
