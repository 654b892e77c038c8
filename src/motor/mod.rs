// Drive control for the four-wheel mecanum base
//
// Provides:
// - Mecanum inverse kinematics (robot intent -> wheel commands) and readback
// - Control-mode state machine over injected wheel actuators
// - Simulated actuators for tests and the demo runtime

pub mod actuator;
pub mod calibration;
mod driver;
pub mod kinematics;
pub mod sim;

pub use actuator::{
    ActuatorError, ClosedLoopConfig, HeadingSensor, SensorError, WheelActuator, WheelPosition,
};
pub use calibration::{CalibrationConstants, LoopParams, PidGains};
pub use driver::{ControlMode, DriveError, DriveTrain};
pub use kinematics::{intent_to_wheels, shortest_angular_delta};
