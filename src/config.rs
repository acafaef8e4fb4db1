//! # Mission configuration
//!
//! All tunables of the figure-8 mission. The defaults fly a 15 m figure-8 at 6 m at 0.3 rad/s, which takes
//! 2π/0.3 ≈ 20.9 s for the loop.
//!
//! A configuration can be loaded from JSON, every missing field keeps its default:
//! ```
//! # use offboard_mission::MissionConfig;
//! let config = MissionConfig::from_json_str(r#"{ "radius": 5.0, "takeoff_altitude": 3.0 }"#).unwrap();
//! assert_eq!(config.radius, 5.0);
//! assert_eq!(config.angular_speed, 0.3);
//! ```

use std::f64::consts::TAU;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{MODE_AUTO_LAND, MODE_OFFBOARD};
use crate::{Error, Result};

/// Figure-8 mission parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Control loop frequency (Hz)
    pub rate_hz: f64,
    /// Altitude of the takeoff point and of the whole figure-8 (meters)
    pub takeoff_altitude: f64,
    /// Amplitude of the figure-8 along x (meters), half of it along y
    pub radius: f64,
    /// Angular speed of the figure-8 parameter (rad/s)
    pub angular_speed: f64,
    /// Time spent holding the takeoff point before starting the figure-8 (seconds)
    pub takeoff_duration: f64,
    /// Minimum time between two mode or arming requests (seconds)
    pub command_cooldown: f64,
    /// Number of setpoints streamed before the first command
    pub warmup_setpoints: u32,
    /// Minimum time between two figure-8 progress log lines (seconds)
    pub progress_log_interval: f64,
    /// Flight mode that follows external setpoints
    pub offboard_mode: String,
    /// Flight mode requested once the figure-8 is done
    pub land_mode: String,
    /// Return from [Mission::run()](crate::Mission::run) once the mission is complete instead of idling until
    /// stopped
    pub exit_on_complete: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20.0,
            takeoff_altitude: 6.0,
            radius: 15.0,
            angular_speed: 0.3,
            takeoff_duration: 15.0,
            command_cooldown: 5.0,
            warmup_setpoints: 100,
            progress_log_interval: 5.0,
            offboard_mode: MODE_OFFBOARD.to_owned(),
            land_mode: MODE_AUTO_LAND.to_owned(),
            exit_on_complete: false,
        }
    }
}

impl MissionConfig {
    /// Parse a configuration from a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MissionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that every value makes sense for flying the mission
    pub fn validate(&self) -> Result<()> {
        positive("rate_hz", self.rate_hz)?;
        positive("angular_speed", self.angular_speed)?;
        non_negative("takeoff_altitude", self.takeoff_altitude)?;
        non_negative("radius", self.radius)?;
        non_negative("takeoff_duration", self.takeoff_duration)?;
        non_negative("command_cooldown", self.command_cooldown)?;
        non_negative("progress_log_interval", self.progress_log_interval)?;

        // Every derived duration must be representable, and the loop period must not round down to zero
        if representable("rate_hz", 1.0 / self.rate_hz)?.is_zero() {
            return Err(Error::ConfigError(format!("rate_hz {} is too high", self.rate_hz)));
        }
        representable("angular_speed", TAU / self.angular_speed)?;
        representable("takeoff_duration", self.takeoff_duration)?;
        representable("command_cooldown", self.command_cooldown)?;
        representable("progress_log_interval", self.progress_log_interval)?;

        if self.offboard_mode.is_empty() {
            return Err(Error::ConfigError("offboard_mode is empty".to_owned()));
        }
        if self.land_mode.is_empty() {
            return Err(Error::ConfigError("land_mode is empty".to_owned()));
        }

        Ok(())
    }

    /// Period of one control loop iteration
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    /// Takeoff hold time as a [Duration]
    pub fn takeoff_hold(&self) -> Duration {
        Duration::from_secs_f64(self.takeoff_duration)
    }

    /// Command cooldown as a [Duration]
    pub fn command_interval(&self) -> Duration {
        Duration::from_secs_f64(self.command_cooldown)
    }

    /// Progress log interval as a [Duration]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs_f64(self.progress_log_interval)
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{} must be a positive number, got {}", name, value)))
    }
}

fn representable(name: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| Error::ConfigError(format!("{} gives a duration of {} s: {}", name, seconds, e)))
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{} must be zero or positive, got {}", name, value)))
    }
}
