//! Background tasks connecting the [Vehicle](crate::Vehicle) subsystems to the link
//!
//! These are private plumbing: the downlink dispatcher fans telemetry out into latest-value channels, the uplink
//! task drains the setpoint queue into the link.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::link::FlightLink;
use crate::mission::CooldownGate;
use crate::types::{Pose, TelemetryUpdate, VehicleStatus};

const DOWNLINK_POLL: Duration = Duration::from_millis(200);
const UPLINK_POLL: Duration = Duration::from_millis(100);
const UPLINK_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) struct TelemetryDispatch {
    link: Arc<dyn FlightLink>,
    status: watch::Sender<VehicleStatus>,
    local_pose: watch::Sender<Pose>,
    disconnect: Arc<AtomicBool>,
}

impl TelemetryDispatch {
    pub fn new(
        link: Arc<dyn FlightLink>,
        disconnect: Arc<AtomicBool>,
    ) -> (Self, watch::Receiver<VehicleStatus>, watch::Receiver<Pose>) {
        let (status, status_rx) = watch::channel(VehicleStatus::default());
        let (local_pose, local_pose_rx) = watch::channel(Pose::default());

        let dispatch = TelemetryDispatch {
            link,
            status,
            local_pose,
            disconnect,
        };

        (dispatch, status_rx, local_pose_rx)
    }

    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            while !self.disconnect.load(Relaxed) {
                match tokio::time::timeout(DOWNLINK_POLL, self.link.recv_telemetry()).await {
                    Ok(Ok(TelemetryUpdate::Status(status))) => {
                        self.status.send_replace(status);
                    }
                    Ok(Ok(TelemetryUpdate::LocalPose(pose))) => {
                        self.local_pose.send_replace(pose);
                    }
                    Err(_) => continue,
                    Ok(Err(e)) => {
                        log::warn!("Telemetry link closed: {}", e);
                        break;
                    }
                }
            }

            // Nothing will update the snapshot anymore
            self.status.send_modify(|status| status.connected = false);
            log::debug!("Telemetry dispatcher stopped");
        })
    }
}

pub(crate) fn spawn_uplink(
    link: Arc<dyn FlightLink>,
    setpoints: flume::Receiver<Pose>,
    disconnect: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut error_log = CooldownGate::new(UPLINK_ERROR_LOG_INTERVAL);

        while !disconnect.load(Relaxed) {
            match tokio::time::timeout(UPLINK_POLL, setpoints.recv_async()).await {
                Ok(Ok(setpoint)) => {
                    if let Err(e) = link.publish_setpoint(&setpoint).await {
                        if error_log.try_acquire(Instant::now()) {
                            log::warn!("Failed to publish setpoint: {}", e);
                        }
                    }
                }
                Err(_) => (),
                Ok(Err(flume::RecvError::Disconnected)) => break,
            }
        }

        log::debug!("Setpoint uplink stopped");
    })
}
