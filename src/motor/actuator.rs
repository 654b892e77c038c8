// Collaborator interfaces consumed by the drive engine
//
// The engine never talks to hardware directly: each wheel is a `WheelActuator`
// and the gyro is a `HeadingSensor`. Implementations live outside this crate,
// except for the simulated ones in `sim`.

use std::fmt;

use super::ControlMode;
use super::calibration::PidGains;

/// Wheel positions on the mecanum base, in engine order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl WheelPosition {
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontLeft,
        WheelPosition::FrontRight,
        WheelPosition::BackLeft,
        WheelPosition::BackRight,
    ];

    pub fn is_right(self) -> bool {
        matches!(self, WheelPosition::FrontRight | WheelPosition::BackRight)
    }

    pub fn name(self) -> &'static str {
        match self {
            WheelPosition::FrontLeft => "front-left",
            WheelPosition::FrontRight => "front-right",
            WheelPosition::BackLeft => "back-left",
            WheelPosition::BackRight => "back-right",
        }
    }
}

impl fmt::Display for WheelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoder setup for closed-loop modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackDevice {
    pub codes_per_rev: u32,
    pub sensor_reversed: bool,
    pub soft_limits_enabled: bool,
}

/// Everything an actuator needs to run in a given control mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedLoopConfig {
    pub mode: ControlMode,
    /// `None` in open-loop mode
    pub gains: Option<PidGains>,
    pub nominal_output_voltage: f64,
    pub peak_output_voltage: f64,
    pub ramp_rate: Option<f64>,
    pub feedback: Option<FeedbackDevice>,
}

/// Error types reported by wheel actuators
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuatorError {
    #[error("Actuator rejected closed-loop parameters: {0}")]
    Rejected(String),

    #[error("Encoder read failed: {0}")]
    ReadFailed(String),
}

/// Error types reported by the heading sensor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Heading sensor unavailable")]
    Unavailable,

    #[error("Heading sensor read failed: {0}")]
    ReadFailed(String),
}

/// One driven wheel: motor output plus its quadrature encoder
///
/// The meaning of `set` depends on the configured mode: a normalized speed in
/// velocity mode, a position target or correction in position mode, and a
/// fraction of bus voltage in open-loop mode.
pub trait WheelActuator {
    fn set(&mut self, value: f64) -> Result<(), ActuatorError>;

    /// Accumulated ticks since the last zeroing, in the wheel's forward sense
    fn position(&mut self) -> Result<i32, ActuatorError>;

    fn zero_position(&mut self) -> Result<(), ActuatorError>;

    /// Ticks per control period
    fn velocity(&mut self) -> Result<i32, ActuatorError>;

    fn configure(&mut self, config: &ClosedLoopConfig) -> Result<(), ActuatorError>;
}

/// Continuous heading in degrees, clockwise positive
pub trait HeadingSensor {
    fn heading(&mut self) -> Result<f64, SensorError>;
}
