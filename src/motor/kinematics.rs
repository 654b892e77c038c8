// Mecanum inverse kinematics for a four-wheel rectangular base
//
// Wheel orientation (rollers seen from above):
//
//   front
//  \\\   ///
//
//  ///   \\\
//   back
//
// Positive x strafes right, positive y drives forward, positive rotation
// spins clockwise.

use crate::messages::{EncoderSnapshot, MotionIntent, WheelCommand};

use super::calibration::CalibrationConstants;

/// Unscaled wheel commands for a motion intent
pub fn mecanum_inverse(intent: MotionIntent) -> WheelCommand {
    let MotionIntent { x, y, rotation } = intent;
    WheelCommand {
        front_left: x + y + rotation,
        front_right: -x + y - rotation,
        back_left: -x + y + rotation,
        back_right: x + y - rotation,
    }
}

/// Divide all four wheels by the largest magnitude if it exceeds 1
///
/// Scaling is uniform so the ratio between wheels, and therefore the direction
/// of travel, is preserved.
pub fn normalize(command: WheelCommand) -> WheelCommand {
    let max = command.max_magnitude();
    if max > 1.0 {
        command.map(|v| v / max)
    } else {
        command
    }
}

/// Convert a motion intent to wheel commands capped at `max_speed`
pub fn intent_to_wheels(intent: MotionIntent, max_speed: f64) -> WheelCommand {
    normalize(mecanum_inverse(intent)).map(|v| v * max_speed)
}

/// Signed shortest rotation from `from` to `to`, in degrees within (-180, 180]
pub fn shortest_angular_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 { delta - 360.0 } else { delta }
}

/// Rotation command that turns the robot toward `target` heading
pub fn heading_hold_rotation(current: f64, target: f64, gain: f64) -> f64 {
    (shortest_angular_delta(current, target) * gain).clamp(-1.0, 1.0)
}

/// Robot-frame intent for travelling along a field angle
///
/// `desired_angle` and `heading` are clockwise degrees in the field frame.
/// The forward unit vector scaled by `speed` is rotated by the difference
/// between where we want to go and where the robot faces.
pub fn field_relative_intent(
    desired_angle: f64,
    heading: f64,
    speed: f64,
    rotation: f64,
) -> MotionIntent {
    let angle = -(desired_angle - heading).to_radians();
    let (sin_a, cos_a) = angle.sin_cos();
    let (x, y) = (0.0, speed);

    MotionIntent {
        x: x * cos_a - y * sin_a,
        y: x * sin_a + y * cos_a,
        rotation,
    }
}

/// Per-wheel encoder targets (ticks) for a robot-frame displacement in inches
pub fn displacement_targets(x: f64, y: f64, calibration: &CalibrationConstants) -> WheelCommand {
    let x_ticks = x * calibration.ticks_per_inch_lateral;
    let y_ticks = y * calibration.ticks_per_inch_forward;
    mecanum_inverse(MotionIntent::new(x_ticks, y_ticks, 0.0))
}

/// Target minus measured ticks, per wheel
pub fn position_errors(targets: WheelCommand, snapshot: EncoderSnapshot) -> WheelCommand {
    let measured = snapshot.as_array();
    let targets = targets.as_array();
    WheelCommand::from_array(std::array::from_fn(|i| {
        targets[i] - f64::from(measured[i])
    }))
}

/// Position targets for an in-place rotation of `angle` radians
///
/// Left wheels drive forward and right wheels backward for a clockwise turn.
pub fn rotation_targets(angle: f64, ticks_per_radian: f64) -> WheelCommand {
    let ticks = angle * ticks_per_radian;
    WheelCommand::new(ticks, -ticks, ticks, -ticks)
}

/// Net forward displacement in inches since the encoders were zeroed
pub fn displacement_y(snapshot: EncoderSnapshot, calibration: &CalibrationConstants) -> f64 {
    let [fl, fr, bl, br] = snapshot.as_array().map(f64::from);
    (fl + fr + bl + br) / 4.0 / calibration.ticks_per_inch_forward
}

/// Net lateral displacement in inches since the encoders were zeroed
pub fn displacement_x(snapshot: EncoderSnapshot, calibration: &CalibrationConstants) -> f64 {
    let [fl, fr, bl, br] = snapshot.as_array().map(f64::from);
    (fl - fr - bl + br) / 4.0 / calibration.ticks_per_inch_lateral
}
