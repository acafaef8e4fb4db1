//! # Figure-8 mission
//!
//! The mission layer sits on top of the [Vehicle](crate::Vehicle) subsystems. It is split between pure pieces that
//! can be tested without any link:
//!  - [trajectory]: the closed-form figure-8 curve
//!  - [phase]: the four-phase [FlightPlan] state machine
//!  - [CooldownGate]: the retry throttle shared by mode and arming requests
//!
//! and the [Mission] runner that ties them to a vehicle at a fixed rate.

mod cooldown;
pub mod phase;
mod runner;
pub mod trajectory;

pub use cooldown::CooldownGate;
pub use phase::{FlightPlan, MissionPhase, Step};
pub use runner::{Mission, MissionEvent, MissionReport};
