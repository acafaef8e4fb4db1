//! Mission phase machine
//!
//! The mission goes through four phases, strictly in order:
//!
//! | Phase | Target | Leaves when |
//! |-------|--------|-------------|
//! | Takeoff | (0, 0, altitude) | the takeoff hold time has elapsed |
//! | Figure8 | lemniscate point | one full loop is done, the target snaps back to (0, 0) |
//! | Land | unchanged | immediately, after requesting the land mode once |
//! | Complete | unchanged | never |
//!
//! [FlightPlan] only computes: it never talks to the vehicle. The caller evaluates a [Step] with the time spent in
//! the current phase, performs the requested command if any, then [applies](FlightPlan::apply) the step.

use std::time::Duration;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::config::MissionConfig;
use crate::mission::trajectory::{lemniscate, loop_duration};
use crate::types::Pose;

/// Mission phase, numbered in flight order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MissionPhase {
    /// Climb to and hold the takeoff altitude
    Takeoff = 1,
    /// Fly one figure-8 loop
    Figure8 = 2,
    /// Hand over to the autopilot landing mode
    Land = 3,
    /// Nothing left to do
    Complete = 4,
}

impl std::fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MissionPhase::Takeoff => "takeoff",
            MissionPhase::Figure8 => "figure-8",
            MissionPhase::Land => "land",
            MissionPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Outcome of evaluating one phase for one loop iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Phase for the next iteration
    pub next: MissionPhase,
    /// Setpoint target after this iteration
    pub target: Pose,
    /// Flight mode to request once, before moving to `next`
    pub request: Option<String>,
}

/// The figure-8 mission as a state machine
#[derive(Debug, Clone)]
pub struct FlightPlan {
    altitude: f64,
    radius: f64,
    angular_speed: f64,
    takeoff_hold: Duration,
    loop_duration: Duration,
    land_mode: String,
    phase: MissionPhase,
    target: Pose,
}

impl FlightPlan {
    /// New plan in the takeoff phase, targeting the takeoff point
    pub fn new(config: &MissionConfig) -> Self {
        Self {
            altitude: config.takeoff_altitude,
            radius: config.radius,
            angular_speed: config.angular_speed,
            takeoff_hold: config.takeoff_hold(),
            loop_duration: loop_duration(config.angular_speed),
            land_mode: config.land_mode.clone(),
            phase: MissionPhase::Takeoff,
            target: Pose::new(0.0, 0.0, config.takeoff_altitude),
        }
    }

    /// Current phase
    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    /// Current setpoint target
    pub fn target(&self) -> Pose {
        self.target
    }

    /// Time needed for one figure-8 loop
    pub fn loop_duration(&self) -> Duration {
        self.loop_duration
    }

    /// Setpoints are streamed only until the autopilot takes over for landing
    pub fn should_publish(&self) -> bool {
        self.phase < MissionPhase::Land
    }

    /// Compute the step for the current phase
    ///
    /// # Arguments
    /// * `time_in_phase` - Time since the phase started
    pub fn evaluate(&self, time_in_phase: Duration) -> Step {
        match self.phase {
            MissionPhase::Takeoff => self.takeoff(time_in_phase),
            MissionPhase::Figure8 => self.figure8(time_in_phase),
            MissionPhase::Land => self.land(),
            MissionPhase::Complete => self.complete(),
        }
    }

    /// Commit a step, returns the previous phase if the phase changed
    ///
    /// Phases only move forward: a step pointing to the current or an earlier phase leaves the phase unchanged.
    pub fn apply(&mut self, step: &Step) -> Option<MissionPhase> {
        self.target = step.target;

        if step.next > self.phase {
            let previous = self.phase;
            self.phase = step.next;
            Some(previous)
        } else {
            None
        }
    }

    fn takeoff(&self, time_in_phase: Duration) -> Step {
        let next = if time_in_phase >= self.takeoff_hold {
            MissionPhase::Figure8
        } else {
            MissionPhase::Takeoff
        };

        Step {
            next,
            target: Pose::new(0.0, 0.0, self.altitude),
            request: None,
        }
    }

    fn figure8(&self, time_in_phase: Duration) -> Step {
        if time_in_phase >= self.loop_duration {
            return Step {
                next: MissionPhase::Land,
                target: Pose::new(0.0, 0.0, self.target.z),
                request: None,
            };
        }

        Step {
            next: MissionPhase::Figure8,
            target: lemniscate(
                self.radius,
                self.angular_speed,
                self.altitude,
                time_in_phase.as_secs_f64(),
            ),
            request: None,
        }
    }

    fn land(&self) -> Step {
        Step {
            next: MissionPhase::Complete,
            target: self.target,
            request: Some(self.land_mode.clone()),
        }
    }

    fn complete(&self) -> Step {
        Step {
            next: MissionPhase::Complete,
            target: self.target,
            request: None,
        }
    }
}
