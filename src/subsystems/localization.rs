use tokio::sync::watch;

use crate::types::Pose;

/// Local position estimate reported by the flight stack
pub struct Localization {
    local_pose: watch::Receiver<Pose>,
}

impl Localization {
    pub(crate) fn new(local_pose: watch::Receiver<Pose>) -> Self {
        Self { local_pose }
    }

    /// Last local pose received, the origin until the first update arrives
    pub fn local_pose(&self) -> Pose {
        *self.local_pose.borrow()
    }
}
