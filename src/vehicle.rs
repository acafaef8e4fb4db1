use crate::dispatch::{spawn_uplink, TelemetryDispatch};
use crate::link::FlightLink;
use crate::subsystems::commander::Commander;
use crate::subsystems::localization::Localization;
use crate::subsystems::supervisor::Supervisor;

use flume as channel;
use futures::lock::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// # The Vehicle
///
/// This struct is one-time use: creating it starts the tasks that move data between the link and the subsystems,
/// and once disconnected it cannot be reconnected. A new one needs to be created from a link to connect again.
///
/// Creating a `Vehicle` does not wait for the autopilot: use
/// [Supervisor::wait_connected()](crate::subsystems::supervisor::Supervisor::wait_connected) or poll
/// [Supervisor::is_connected()](crate::subsystems::supervisor::Supervisor::is_connected) for that.
///
/// See the [crate root documentation](crate) for more context and information.
pub struct Vehicle {
    /// Setpoint subsystem access
    pub commander: Commander,
    /// Status and command subsystem access
    pub supervisor: Supervisor,
    /// Local position estimate access
    pub localization: Localization,
    uplink_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    disconnect: Arc<AtomicBool>,
}

impl Vehicle {
    /// Wire a vehicle to an open flight stack link
    ///
    /// Must be called from within a tokio runtime: the telemetry dispatcher and the setpoint uplink are spawned as
    /// tasks on it.
    pub fn from_link(link: Arc<dyn FlightLink>) -> Self {
        let disconnect = Arc::new(AtomicBool::new(false));

        // Downlink dispatcher
        let (dispatcher, status, local_pose) =
            TelemetryDispatch::new(link.clone(), disconnect.clone());
        let dispatch_task = dispatcher.run();

        // Uplink queue
        let (uplink, rx) = channel::unbounded();
        let uplink_task = spawn_uplink(link.clone(), rx, disconnect.clone());

        Vehicle {
            commander: Commander::new(uplink),
            supervisor: Supervisor::new(link, status),
            localization: Localization::new(local_pose),
            uplink_task: Mutex::new(Some(uplink_task)),
            dispatch_task: Mutex::new(Some(dispatch_task)),
            disconnect,
        }
    }

    /// Disconnect the vehicle
    ///
    /// The connection can be ended in two ways: either by dropping the [Vehicle] object or by calling this
    /// disconnect() function. Once this function returns, both background tasks have stopped.
    ///
    /// Once disconnected, [Commander::setpoint_position()] returns
    /// [Error::Disconnected](crate::Error::Disconnected) and the status snapshot reports `connected = false`.
    pub async fn disconnect(&self) {
        // Set disconnect to true, will make both uplink and dispatcher task quit
        self.disconnect.store(true, Relaxed);

        if let Some(uplink_task) = self.uplink_task.lock().await.take() {
            if let Err(e) = uplink_task.await {
                log::warn!("Setpoint uplink task failed: {}", e);
            }
        }
        if let Some(dispatch_task) = self.dispatch_task.lock().await.take() {
            if let Err(e) = dispatch_task.await {
                log::warn!("Telemetry dispatcher task failed: {}", e);
            }
        }
    }
}

impl Drop for Vehicle {
    fn drop(&mut self) {
        self.disconnect.store(true, Relaxed);
    }
}
