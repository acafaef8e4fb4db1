use std::time::Duration;

use tokio::time::Instant;

/// Minimum interval between two attempts of something
///
/// A gate opens once `interval` has elapsed since the last recorded attempt. A gate created with [CooldownGate::new]
/// is open right away; one created with [CooldownGate::started_at] first waits a full interval.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl CooldownGate {
    /// Gate that is open until the first attempt
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// Gate that counts `now` as the last attempt
    pub fn started_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_attempt: Some(now),
        }
    }

    /// True if an attempt is allowed at `now`
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Record an attempt at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Record an attempt at `now` if the gate is open, returns whether it was
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    /// Instant of the last recorded attempt
    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }
}
