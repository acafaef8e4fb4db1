//! Data exchanged with the flight stack

/// Flight mode that makes the autopilot follow setpoints from this crate
pub const MODE_OFFBOARD: &str = "OFFBOARD";
/// Autonomous landing mode
pub const MODE_AUTO_LAND: &str = "AUTO.LAND";

/// Position in the local frame (meters, ENU as seen by the flight stack)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// East (meters)
    pub x: f64,
    /// North (meters)
    pub y: f64,
    /// Up (meters)
    pub z: f64,
}

impl Pose {
    /// Create a pose from its three coordinates
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Connection, arming and mode state reported by the flight stack
///
/// Each update replaces the previous one: only the latest value matters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VehicleStatus {
    /// The middleware has a heartbeat from the autopilot
    pub connected: bool,
    /// Motors are armed
    pub armed: bool,
    /// Current flight mode name, for example `"OFFBOARD"`
    pub mode: String,
}

impl VehicleStatus {
    /// True when the vehicle is armed and follows offboard setpoints in the given mode
    pub fn is_flying_offboard(&self, offboard_mode: &str) -> bool {
        self.armed && self.mode == offboard_mode
    }
}

/// One update pushed by the flight stack
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    /// New status snapshot (status topic)
    Status(VehicleStatus),
    /// New local position estimate (local pose topic)
    LocalPose(Pose),
}
