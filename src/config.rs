// Loop timing, electrical constants and robot configuration loading
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motor::CalibrationConstants;
use crate::vision::{CameraModel, PhysicalTargetSize};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Give up on a displacement move after this long
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(10);

// Battery voltage that normalized commands are relative to
pub const NOMINAL_BATTERY_VOLTAGE: f64 = 12.0;

// Arrival tolerance in encoder ticks
pub const DEFAULT_EPSILON: f64 = 20.0;

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-robot configuration, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    pub drive: CalibrationConstants,
    pub camera: CameraModel,
    /// Retro-reflective target size, inches
    pub target: PhysicalTargetSize,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            drive: CalibrationConstants::default(),
            camera: CameraModel::default(),
            target: PhysicalTargetSize::new(10.25, 5.0),
        }
    }
}

impl RobotConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }
}
