// Value types exchanged between the drive engine and its caller

use serde::{Deserialize, Serialize};

// Robot-frame motion request: lateral, forward and clockwise angular velocity.
// Components are nominally in [-1, 1] but anything is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MotionIntent {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl MotionIntent {
    pub fn new(x: f64, y: f64, rotation: f64) -> Self {
        Self { x, y, rotation }
    }
}

/// One value per mecanum wheel
///
/// Usually a normalized actuator command; the kinematics also use it for
/// per-wheel encoder targets and errors, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WheelCommand {
    pub front_left: f64,
    pub front_right: f64,
    pub back_left: f64,
    pub back_right: f64,
}

impl WheelCommand {
    pub fn new(front_left: f64, front_right: f64, back_left: f64, back_right: f64) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns commands as array [front_left, front_right, back_left, back_right]
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Largest absolute value across the four wheels
    pub fn max_magnitude(&self) -> f64 {
        self.as_array().iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_array(self.as_array().map(f))
    }
}

/// Raw accumulated encoder ticks, one per wheel, since the last origin reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EncoderSnapshot {
    pub front_left: i32,
    pub front_right: i32,
    pub back_left: i32,
    pub back_right: i32,
}

impl EncoderSnapshot {
    pub fn from_array(ticks: [i32; 4]) -> Self {
        Self {
            front_left: ticks[0],
            front_right: ticks[1],
            back_left: ticks[2],
            back_right: ticks[3],
        }
    }

    /// Returns ticks as array [front_left, front_right, back_left, back_right]
    pub fn as_array(&self) -> [i32; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }
}

/// Outcome of a runtime drive session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Arrived,
    TimedOut,
}
