//! # Simulated autopilot
//!
//! [SimulatedAutopilot] implements [FlightLink] without any flight stack behind it. It follows the rules a PX4
//! autopilot applies to offboard control closely enough to exercise a mission end to end:
//!  - the offboard mode is refused unless setpoints are streaming
//!  - the vehicle leaves offboard mode if the setpoint stream goes stale
//!  - the land mode brings the vehicle down and disarms it after a while
//!
//! Every setpoint and command received is recorded with its instant so that tests can check the traffic. The
//! records are never dropped: memory grows with the flight time, keep simulated runs short.
//! All times come from the tokio clock, which makes the simulation usable with a paused clock.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::link::FlightLink;
use crate::types::{Pose, TelemetryUpdate, VehicleStatus, MODE_AUTO_LAND, MODE_OFFBOARD};
use crate::{Error, Result};

/// Mode the simulated autopilot falls back to when offboard setpoints stop
pub const MODE_FAILSAFE: &str = "AUTO.LOITER";

/// Behavior of the [SimulatedAutopilot]
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Time after creation before the autopilot reports connected
    pub connect_delay: Duration,
    /// Interval between two telemetry updates, status and pose alternate
    pub telemetry_period: Duration,
    /// Offboard mode needs a setpoint received within this time
    pub setpoint_timeout: Duration,
    /// Number of offboard requests refused before accepting
    pub offboard_rejections: u32,
    /// Number of arming requests refused before accepting
    pub arm_rejections: u32,
    /// Number of land mode requests refused before accepting
    pub land_rejections: u32,
    /// Time from entering the land mode to touchdown and disarm
    pub landing_duration: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_secs(1),
            telemetry_period: Duration::from_millis(20),
            setpoint_timeout: Duration::from_millis(500),
            offboard_rejections: 0,
            arm_rejections: 0,
            land_rejections: 0,
            landing_duration: Duration::from_secs(8),
        }
    }
}

/// Command received by the simulated autopilot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    /// Flight mode change request
    SetMode(String),
    /// Arming (`true`) or disarming (`false`) request
    Arm(bool),
}

/// A command and the answer it got
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    /// When the command was received
    pub at: Instant,
    /// The command
    pub command: SimCommand,
    /// The answer sent back
    pub accepted: bool,
}

/// A setpoint as received by the autopilot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointRecord {
    /// When the setpoint was received
    pub at: Instant,
    /// Target position
    pub pose: Pose,
}

#[derive(Debug, Default)]
struct SimState {
    armed: bool,
    mode: String,
    position: Pose,
    last_setpoint_at: Option<Instant>,
    land_started: Option<Instant>,
    offboard_rejections: u32,
    arm_rejections: u32,
    land_rejections: u32,
    send_pose_next: bool,
    closed: bool,
    setpoints: Vec<SetpointRecord>,
    commands: Vec<CommandRecord>,
}

/// In-process stand-in for a flight stack
///
/// See the [sim module documentation](crate::sim) for the simulated rules.
pub struct SimulatedAutopilot {
    config: SimConfig,
    created: Instant,
    state: Mutex<SimState>,
}

impl SimulatedAutopilot {
    /// Start a simulated autopilot, the connection delay counts from now
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            mode: "MANUAL".to_owned(),
            offboard_rejections: config.offboard_rejections,
            arm_rejections: config.arm_rejections,
            land_rejections: config.land_rejections,
            ..Default::default()
        };

        Self {
            config,
            created: Instant::now(),
            state: Mutex::new(state),
        }
    }

    /// Current status as the autopilot would report it
    pub fn status(&self) -> VehicleStatus {
        let now = Instant::now();
        let mut state = self.lock();
        self.update(&mut state, now);
        self.status_of(&state, now)
    }

    /// Current vehicle position
    pub fn position(&self) -> Pose {
        self.lock().position
    }

    /// All setpoints received so far
    ///
    /// The history is unbounded, about 1200 records per minute at 20 Hz.
    pub fn setpoints(&self) -> Vec<SetpointRecord> {
        self.lock().setpoints.clone()
    }

    /// All commands received so far, in order
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.lock().commands.clone()
    }

    /// Simulate a link loss, every call fails with [Error::Disconnected] afterwards
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_connected(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= self.config.connect_delay
    }

    fn status_of(&self, state: &SimState, now: Instant) -> VehicleStatus {
        VehicleStatus {
            connected: self.is_connected(now) && !state.closed,
            armed: state.armed,
            mode: state.mode.clone(),
        }
    }

    fn setpoints_streaming(&self, state: &SimState, now: Instant) -> bool {
        state
            .last_setpoint_at
            .map(|at| now.saturating_duration_since(at) <= self.config.setpoint_timeout)
            .unwrap_or(false)
    }

    /// Advance the autopilot-side state machine to `now`
    fn update(&self, state: &mut SimState, now: Instant) {
        if state.mode == MODE_OFFBOARD && !self.setpoints_streaming(state, now) {
            state.mode = MODE_FAILSAFE.to_owned();
        }

        if let Some(started) = state.land_started {
            if state.armed && now.saturating_duration_since(started) >= self.config.landing_duration {
                state.position.z = 0.0;
                state.armed = false;
            }
        }
    }

    fn accept_mode(&self, state: &mut SimState, mode: &str, now: Instant) -> bool {
        if !self.is_connected(now) {
            return false;
        }

        if mode == MODE_OFFBOARD {
            if !self.setpoints_streaming(state, now) {
                return false;
            }
            if state.offboard_rejections > 0 {
                state.offboard_rejections -= 1;
                return false;
            }
        }
        if mode == MODE_AUTO_LAND && state.land_rejections > 0 {
            state.land_rejections -= 1;
            return false;
        }

        state.land_started = if mode == MODE_AUTO_LAND { Some(now) } else { None };
        state.mode = mode.to_owned();
        true
    }

    fn accept_arming(&self, state: &mut SimState, value: bool, now: Instant) -> bool {
        if !self.is_connected(now) {
            return false;
        }

        if value && state.arm_rejections > 0 {
            state.arm_rejections -= 1;
            return false;
        }

        state.armed = value;
        true
    }
}

#[async_trait]
impl FlightLink for SimulatedAutopilot {
    async fn recv_telemetry(&self) -> Result<TelemetryUpdate> {
        tokio::time::sleep(self.config.telemetry_period).await;

        let now = Instant::now();
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Disconnected);
        }
        self.update(&mut state, now);

        state.send_pose_next = !state.send_pose_next;
        if state.send_pose_next {
            Ok(TelemetryUpdate::Status(self.status_of(&state, now)))
        } else {
            Ok(TelemetryUpdate::LocalPose(state.position))
        }
    }

    async fn publish_setpoint(&self, setpoint: &Pose) -> Result<()> {
        let now = Instant::now();
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Disconnected);
        }
        self.update(&mut state, now);

        state.last_setpoint_at = Some(now);
        state.setpoints.push(SetpointRecord { at: now, pose: *setpoint });
        if state.armed && state.mode == MODE_OFFBOARD {
            state.position = *setpoint;
        }

        Ok(())
    }

    async fn set_mode(&self, mode: &str) -> Result<bool> {
        let now = Instant::now();
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Disconnected);
        }
        self.update(&mut state, now);

        let accepted = self.accept_mode(&mut state, mode, now);
        state.commands.push(CommandRecord {
            at: now,
            command: SimCommand::SetMode(mode.to_owned()),
            accepted,
        });

        Ok(accepted)
    }

    async fn arm(&self, value: bool) -> Result<bool> {
        let now = Instant::now();
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Disconnected);
        }
        self.update(&mut state, now);

        let accepted = self.accept_arming(&mut state, value, now);
        state.commands.push(CommandRecord {
            at: now,
            command: SimCommand::Arm(value),
            accepted,
        });

        Ok(accepted)
    }
}
