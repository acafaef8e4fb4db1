//! Closed-form figure-8 trajectory
//!
//! The figure-8 is a Lemniscate of Gerono: `x = R·sin(θ)`, `y = R·sin(θ)·cos(θ)` with `θ = ω·t`. It starts and
//! ends at the origin, so the takeoff point above the origin joins it without a jump. One full loop takes `2π/ω`.

use std::f64::consts::TAU;
use std::time::Duration;

use crate::types::Pose;

/// Point of the figure-8 at time `t` (seconds) after the start of the loop
///
/// # Arguments
/// * `radius` - Amplitude along x (meters), the y amplitude is half of it
/// * `angular_speed` - Speed of the curve parameter (rad/s)
/// * `altitude` - Constant z of the whole curve (meters)
/// * `t` - Time since the start of the loop (seconds)
pub fn lemniscate(radius: f64, angular_speed: f64, altitude: f64, t: f64) -> Pose {
    let angle = angular_speed * t;
    let (sin, cos) = angle.sin_cos();

    Pose::new(radius * sin, radius * sin * cos, altitude)
}

/// Time needed to fly exactly one figure-8 at the given angular speed (rad/s)
pub fn loop_duration(angular_speed: f64) -> Duration {
    Duration::from_secs_f64(TAU / angular_speed)
}
