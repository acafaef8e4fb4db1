//! # Vehicle subsystems
//!
//! The flight stack exposes a handful of independent topics and services. Each subsystem here groups the ones that
//! share a logical role, and all of them are available as public fields of the [Vehicle](crate::Vehicle) struct.

pub mod commander;
pub mod localization;
pub mod supervisor;
