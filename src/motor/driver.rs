// Drive engine for the mecanum base
//
// Owns the four wheel actuators, the heading sensor and the active control
// mode. Every motion entry point first makes sure the actuators run in the
// mode it needs, then writes one command per wheel.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::actuator::{ActuatorError, HeadingSensor, SensorError, WheelActuator, WheelPosition};
use super::calibration::CalibrationConstants;
use super::kinematics;
use crate::messages::{EncoderSnapshot, MotionIntent, WheelCommand};

/// Closed-loop strategy the actuators are configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    VelocityClosedLoop,
    PositionClosedLoop,
    OpenLoopVoltage,
}

/// Error types for the drive engine
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Switch to {mode:?} failed on {wheel} wheel: {source}")]
    ModeSwitch {
        mode: ControlMode,
        wheel: WheelPosition,
        source: ActuatorError,
    },

    #[error("Actuator fault on {wheel} wheel: {source}")]
    Actuator {
        wheel: WheelPosition,
        source: ActuatorError,
    },

    #[error("Heading sensor fault: {0}")]
    Heading(#[from] SensorError),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// Mecanum drive train with four independently driven wheels
///
/// Not reentrant: every operation takes `&mut self`, callers sharing the
/// engine across tasks must serialize access themselves.
pub struct DriveTrain<A, H> {
    wheels: [A; 4], // [front_left, front_right, back_left, back_right]
    heading: H,
    calibration: CalibrationConstants,
    mode: ControlMode,
}

impl<A: WheelActuator, H: HeadingSensor> DriveTrain<A, H> {
    /// Take ownership of the wheels and gyro and configure velocity control
    ///
    /// Fails if any wheel refuses the initial configuration.
    pub fn new(wheels: [A; 4], heading: H, calibration: CalibrationConstants) -> Result<Self> {
        let mut drive = Self {
            wheels,
            heading,
            calibration,
            mode: ControlMode::VelocityClosedLoop,
        };
        info!("Configuring drive train for {:?}", drive.mode);
        drive.reconfigure(ControlMode::VelocityClosedLoop, None)?;
        Ok(drive)
    }

    /// Currently active control mode
    pub fn state(&self) -> ControlMode {
        self.mode
    }

    pub fn calibration(&self) -> &CalibrationConstants {
        &self.calibration
    }

    pub fn wheel(&self, position: WheelPosition) -> &A {
        &self.wheels[position as usize]
    }

    pub fn actuators_mut(&mut self) -> &mut [A; 4] {
        &mut self.wheels
    }

    pub fn heading_sensor_mut(&mut self) -> &mut H {
        &mut self.heading
    }

    /// Reconfigure all four wheels for `mode`
    ///
    /// Does nothing if `mode` is already active. The new mode is only recorded
    /// once every wheel has accepted it; on failure the wheels already switched
    /// are put back and the previous mode stays active.
    pub fn switch_state(&mut self, mode: ControlMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        info!("Switching drive mode {:?} -> {:?}", self.mode, mode);
        self.reconfigure(mode, Some(self.mode))?;
        self.mode = mode;
        Ok(())
    }

    fn ensure_mode(&mut self, mode: ControlMode) -> Result<()> {
        self.switch_state(mode)
    }

    fn reconfigure(&mut self, mode: ControlMode, previous: Option<ControlMode>) -> Result<()> {
        for (i, wheel) in WheelPosition::ALL.into_iter().enumerate() {
            let config = self.calibration.closed_loop_config(mode, wheel);
            if let Err(source) = self.wheels[i].configure(&config) {
                warn!("{} wheel rejected {:?} configuration: {}", wheel, mode, source);
                if let Some(previous) = previous {
                    self.roll_back(i, previous);
                }
                return Err(DriveError::ModeSwitch {
                    mode,
                    wheel,
                    source,
                });
            }
        }
        Ok(())
    }

    /// Return the first `count` wheels to `mode`'s parameters
    fn roll_back(&mut self, count: usize, mode: ControlMode) {
        for (i, wheel) in WheelPosition::ALL.into_iter().enumerate().take(count) {
            let config = self.calibration.closed_loop_config(mode, wheel);
            if let Err(e) = self.wheels[i].configure(&config) {
                warn!("Failed to restore {} wheel to {:?}: {}", wheel, mode, e);
            }
        }
    }

    /// Current heading, refusing readings that are not a real angle
    fn read_heading(&mut self) -> Result<f64> {
        let heading = self.heading.heading()?;
        if !heading.is_finite() {
            return Err(SensorError::ReadFailed(format!("heading is {heading}")).into());
        }
        Ok(heading)
    }

    /// Write one value per wheel in the current mode
    fn write(&mut self, command: WheelCommand) -> Result<()> {
        debug!(
            "Setting wheels ({:?}): fl={:.3}, fr={:.3}, bl={:.3}, br={:.3}",
            self.mode,
            command.front_left,
            command.front_right,
            command.back_left,
            command.back_right
        );
        for (i, value) in command.as_array().into_iter().enumerate() {
            self.wheels[i]
                .set(value)
                .map_err(|source| DriveError::Actuator {
                    wheel: WheelPosition::ALL[i],
                    source,
                })?;
        }
        Ok(())
    }

    /// Drive with a robot-frame velocity intent
    ///
    /// Out-of-range intents are scaled down uniformly across all wheels.
    pub fn move_robot(&mut self, intent: MotionIntent) -> Result<()> {
        self.ensure_mode(ControlMode::VelocityClosedLoop)?;
        let command = kinematics::intent_to_wheels(intent, self.calibration.max_speed);
        self.write(command)
    }

    /// Travel along a field-relative angle while rotating at `rotation`
    ///
    /// # Arguments
    /// * `angle` - Field direction in degrees, clockwise
    /// * `speed` - Translation speed in [0, 1]
    /// * `rotation` - Rotation rate, not an angle
    pub fn move_at_angle(&mut self, angle: f64, speed: f64, rotation: f64) -> Result<()> {
        self.ensure_mode(ControlMode::VelocityClosedLoop)?;
        let heading = self.read_heading()?;
        let intent = kinematics::field_relative_intent(angle, heading, speed, rotation);
        self.move_robot(intent)
    }

    /// Translate in the robot frame while holding a heading (degrees, clockwise)
    pub fn move_with_fixed_angle(&mut self, x: f64, y: f64, angle: f64) -> Result<()> {
        self.ensure_mode(ControlMode::VelocityClosedLoop)?;
        let heading = self.read_heading()?;
        let rotation =
            kinematics::heading_hold_rotation(heading, angle, self.calibration.heading_gain);
        self.move_robot(MotionIntent::new(x, y, rotation))
    }

    /// Drive each wheel toward the encoder target for a displacement in inches
    ///
    /// Call once per cycle; each wheel's correction is clamped on its own.
    pub fn move_to_distance(&mut self, x: f64, y: f64) -> Result<()> {
        self.ensure_mode(ControlMode::PositionClosedLoop)?;
        let targets = kinematics::displacement_targets(x, y, &self.calibration);
        let errors = kinematics::position_errors(targets, self.encoder_snapshot()?);

        let p = self.calibration.position.gains.p;
        let cap = self.calibration.max_position_command();
        let command = errors.map(|error| (error * p).clamp(-cap, cap));
        self.write(command)
    }

    /// Spin in place by `angle` radians (clockwise positive)
    pub fn rotate(&mut self, angle: f64) -> Result<()> {
        self.ensure_mode(ControlMode::PositionClosedLoop)?;
        let targets = kinematics::rotation_targets(angle, self.calibration.ticks_per_radian);
        self.write(targets)
    }

    /// Command zero on every wheel without changing mode
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping all wheels");
        self.write(WheelCommand::zero())
    }

    /// Make the current wheel positions the new origin
    pub fn reset_origin(&mut self) -> Result<()> {
        debug!("Resetting encoder origin");
        for (i, wheel) in WheelPosition::ALL.into_iter().enumerate() {
            self.wheels[i]
                .zero_position()
                .map_err(|source| DriveError::Actuator { wheel, source })?;
        }
        Ok(())
    }

    /// Read accumulated ticks from all four encoders
    pub fn encoder_snapshot(&mut self) -> Result<EncoderSnapshot> {
        let mut ticks = [0i32; 4];
        for (i, wheel) in WheelPosition::ALL.into_iter().enumerate() {
            ticks[i] = self.wheels[i]
                .position()
                .map_err(|source| DriveError::Actuator { wheel, source })?;
        }
        Ok(EncoderSnapshot::from_array(ticks))
    }

    /// Read current tick velocities, [front_left, front_right, back_left, back_right]
    pub fn velocity_snapshot(&mut self) -> Result<[i32; 4]> {
        let mut velocities = [0i32; 4];
        for (i, wheel) in WheelPosition::ALL.into_iter().enumerate() {
            velocities[i] = self.wheels[i]
                .velocity()
                .map_err(|source| DriveError::Actuator { wheel, source })?;
        }
        Ok(velocities)
    }

    /// True once every wheel is within `epsilon` ticks of the displacement
    /// target and every wheel is slower than `epsilon`
    pub fn is_there(&mut self, epsilon: f64, x: f64, y: f64) -> Result<bool> {
        let targets = kinematics::displacement_targets(x, y, &self.calibration);
        let errors = kinematics::position_errors(targets, self.encoder_snapshot()?);
        let max_error = errors.max_magnitude();

        let max_velocity = self
            .velocity_snapshot()?
            .iter()
            .map(|v| f64::from(v.unsigned_abs()))
            .fold(0.0f64, f64::max);

        Ok(max_velocity < epsilon && max_error < epsilon)
    }

    /// True if any single wheel has slowed below `epsilon`
    ///
    /// Weaker than `is_there`: it looks at the slowest wheel only, which makes
    /// it a stall check rather than an arrival check.
    pub fn is_there_at_all(&mut self, epsilon: f64) -> Result<bool> {
        let min_velocity = self
            .velocity_snapshot()?
            .iter()
            .map(|v| f64::from(v.unsigned_abs()))
            .fold(f64::INFINITY, f64::min);

        Ok(min_velocity < epsilon)
    }

    /// Forward displacement in inches since the last origin reset
    pub fn displacement_y(&mut self) -> Result<f64> {
        let snapshot = self.encoder_snapshot()?;
        Ok(kinematics::displacement_y(snapshot, &self.calibration))
    }

    /// Lateral displacement in inches since the last origin reset
    pub fn displacement_x(&mut self) -> Result<f64> {
        let snapshot = self.encoder_snapshot()?;
        Ok(kinematics::displacement_x(snapshot, &self.calibration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::sim::{SimHeading, SimWheel};

    type SimDrive = DriveTrain<SimWheel, SimHeading>;

    fn sim_drive() -> SimDrive {
        let wheels = [
            SimWheel::default(),
            SimWheel::default(),
            SimWheel::default(),
            SimWheel::default(),
        ];
        DriveTrain::new(wheels, SimHeading::new(0.0), CalibrationConstants::default()).unwrap()
    }

    fn commands(drive: &SimDrive) -> [f64; 4] {
        WheelPosition::ALL.map(|w| drive.wheel(w).command())
    }

    fn configure_counts(drive: &SimDrive) -> [usize; 4] {
        WheelPosition::ALL.map(|w| drive.wheel(w).configure_count())
    }

    fn step(drive: &mut SimDrive) {
        for wheel in drive.actuators_mut() {
            wheel.step();
        }
    }

    #[test]
    fn test_starts_in_velocity_mode() {
        let drive = sim_drive();
        assert_eq!(drive.state(), ControlMode::VelocityClosedLoop);
        for wheel in WheelPosition::ALL {
            assert_eq!(drive.wheel(wheel).mode(), Some(ControlMode::VelocityClosedLoop));
        }
        assert_eq!(configure_counts(&drive), [1; 4]);
    }

    #[test]
    fn test_switch_state_is_idempotent() {
        let mut drive = sim_drive();
        drive.switch_state(ControlMode::VelocityClosedLoop).unwrap();
        assert_eq!(configure_counts(&drive), [1; 4]);

        drive.switch_state(ControlMode::PositionClosedLoop).unwrap();
        drive.switch_state(ControlMode::PositionClosedLoop).unwrap();
        assert_eq!(configure_counts(&drive), [2; 4]);
        assert_eq!(drive.state(), ControlMode::PositionClosedLoop);

        drive.switch_state(ControlMode::OpenLoopVoltage).unwrap();
        assert_eq!(drive.state(), ControlMode::OpenLoopVoltage);
        assert_eq!(configure_counts(&drive), [3; 4]);
    }

    #[test]
    fn test_failed_switch_keeps_previous_mode() {
        let mut drive = sim_drive();
        drive.actuators_mut()[2].reject_configure(true);

        let err = drive.switch_state(ControlMode::PositionClosedLoop).unwrap_err();
        match err {
            DriveError::ModeSwitch { mode, wheel, .. } => {
                assert_eq!(mode, ControlMode::PositionClosedLoop);
                assert_eq!(wheel, WheelPosition::BackLeft);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(drive.state(), ControlMode::VelocityClosedLoop);

        // Wheels switched before the fault are restored
        assert_eq!(
            drive.wheel(WheelPosition::FrontLeft).mode(),
            Some(ControlMode::VelocityClosedLoop)
        );
        assert_eq!(
            drive.wheel(WheelPosition::FrontRight).mode(),
            Some(ControlMode::VelocityClosedLoop)
        );

        // Caller may retry once the fault clears
        drive.actuators_mut()[2].reject_configure(false);
        drive.switch_state(ControlMode::PositionClosedLoop).unwrap();
        assert_eq!(drive.state(), ControlMode::PositionClosedLoop);
    }

    #[test]
    fn test_failed_switch_blocks_motion() {
        let mut drive = sim_drive();
        drive.actuators_mut()[0].reject_configure(true);
        assert!(drive.move_to_distance(10.0, 0.0).is_err());
        assert_eq!(commands(&drive), [0.0; 4]);
    }

    #[test]
    fn test_move_robot_scales_uniformly() {
        let mut drive = sim_drive();
        drive.move_robot(MotionIntent::new(2.0, 2.0, 0.0)).unwrap();
        assert_eq!(commands(&drive), [1.0, 0.0, 0.0, 1.0]);

        drive.move_robot(MotionIntent::new(0.0, 3.0, 1.0)).unwrap();
        let [fl, fr, bl, br] = commands(&drive);
        assert!((fl - 1.0).abs() < 1e-12);
        assert!((fr - 0.5).abs() < 1e-12);
        assert!((bl - 1.0).abs() < 1e-12);
        assert!((br - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_move_robot_returns_to_velocity_mode() {
        let mut drive = sim_drive();
        drive.rotate(1.0).unwrap();
        assert_eq!(drive.state(), ControlMode::PositionClosedLoop);
        drive.move_robot(MotionIntent::new(0.0, 0.5, 0.0)).unwrap();
        assert_eq!(drive.state(), ControlMode::VelocityClosedLoop);
    }

    #[test]
    fn test_move_at_angle_uses_heading() {
        let mut drive = sim_drive();
        drive.heading_sensor_mut().set_heading(90.0);

        // Facing 90 degrees and asked to go 90 degrees: straight ahead
        drive.move_at_angle(90.0, 0.5, 0.0).unwrap();
        for value in commands(&drive) {
            assert!((value - 0.5).abs() < 1e-9);
        }

        // Asked to go toward field 0 degrees: that is to the robot's left
        drive.move_at_angle(0.0, 0.5, 0.0).unwrap();
        let [fl, fr, bl, br] = commands(&drive);
        assert!((fl + 0.5).abs() < 1e-9);
        assert!((fr - 0.5).abs() < 1e-9);
        assert!((bl - 0.5).abs() < 1e-9);
        assert!((br + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_move_with_fixed_angle_turns_short_way() {
        let mut drive = sim_drive();
        drive.heading_sensor_mut().set_heading(350.0);

        // Target 10 degrees: +20 degree error, gain 0.02 -> rotation 0.4
        drive.move_with_fixed_angle(0.0, 0.0, 10.0).unwrap();
        let [fl, fr, bl, br] = commands(&drive);
        assert!((fl - 0.4).abs() < 1e-9);
        assert!((fr + 0.4).abs() < 1e-9);
        assert!((bl - 0.4).abs() < 1e-9);
        assert!((br + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_heading_failure_is_reported() {
        let mut drive = sim_drive();
        drive.heading_sensor_mut().set_available(false);
        let err = drive.move_at_angle(0.0, 0.5, 0.0).unwrap_err();
        assert!(matches!(err, DriveError::Heading(SensorError::Unavailable)));
        assert_eq!(commands(&drive), [0.0; 4]);
    }

    #[test]
    fn test_non_finite_heading_is_reported() {
        let mut drive = sim_drive();
        for bad in [f64::NAN, f64::INFINITY] {
            drive.heading_sensor_mut().set_heading(bad);
            let err = drive.move_at_angle(0.0, 0.5, 0.0).unwrap_err();
            assert!(matches!(err, DriveError::Heading(SensorError::ReadFailed(_))));
            let err = drive.move_with_fixed_angle(0.0, 0.5, 0.0).unwrap_err();
            assert!(matches!(err, DriveError::Heading(SensorError::ReadFailed(_))));
        }
        assert_eq!(commands(&drive), [0.0; 4]);
    }

    #[test]
    fn test_rotate_sign_pattern() {
        let mut drive = sim_drive();
        drive.rotate(0.5).unwrap();
        assert_eq!(drive.state(), ControlMode::PositionClosedLoop);
        let [fl, fr, bl, br] = commands(&drive);
        assert_eq!(fl, 1273.0);
        assert_eq!(fl, bl);
        assert_eq!(fl, -fr);
        assert_eq!(fl, -br);
    }

    #[test]
    fn test_move_to_distance_clamps_each_wheel() {
        let mut drive = sim_drive();
        drive.reset_origin().unwrap();
        // Front-right is almost on its -2400 tick target, the others are far off
        drive.actuators_mut()[1].set_position(-2360.0);
        drive.move_to_distance(10.0, 0.0).unwrap();
        assert_eq!(drive.state(), ControlMode::PositionClosedLoop);

        let cap = drive.calibration().max_position_command();
        let [fl, fr, bl, br] = commands(&drive);
        assert_eq!(fl, cap);
        assert_eq!(bl, -cap);
        assert_eq!(br, cap);
        assert!((fr + 0.1).abs() < 1e-9, "front-right {fr}");
    }

    #[test]
    fn test_move_to_distance_small_error_not_clamped() {
        let mut drive = sim_drive();
        let cal = drive.calibration().clone();
        let targets = kinematics::displacement_targets(0.0, 10.0, &cal);
        for (i, target) in targets.as_array().into_iter().enumerate() {
            drive.actuators_mut()[i].set_position(target - 40.0);
        }
        drive.move_to_distance(0.0, 10.0).unwrap();
        let [fl, fr, bl, br] = commands(&drive);
        // Errors round to 40 or 41 ticks depending on the fractional target
        for value in [fl, fr, bl, br] {
            assert!(value > 0.09 && value < 0.11, "value {value}");
        }
    }

    #[test]
    fn test_move_to_distance_converges_and_reads_back() {
        let mut drive = sim_drive();
        drive.reset_origin().unwrap();

        let (x, y) = (-8.0, 24.0);
        let mut arrived = false;
        for _ in 0..500 {
            drive.move_to_distance(x, y).unwrap();
            step(&mut drive);
            if drive.is_there(2.0, x, y).unwrap() {
                arrived = true;
                break;
            }
        }
        assert!(arrived, "drive never converged");
        assert!((drive.displacement_x().unwrap() - x).abs() < 0.05);
        assert!((drive.displacement_y().unwrap() - y).abs() < 0.05);
    }

    #[test]
    fn test_is_there_requires_low_velocity() {
        let mut drive = sim_drive();
        drive.reset_origin().unwrap();
        // On target but still commanded to move
        drive.move_robot(MotionIntent::new(0.0, 0.5, 0.0)).unwrap();
        assert!(!drive.is_there(1.0, 0.0, 0.0).unwrap());

        drive.stop().unwrap();
        assert!(drive.is_there(1.0, 0.0, 0.0).unwrap());
    }

    #[test]
    fn test_is_there_at_all_uses_slowest_wheel() {
        let mut drive = sim_drive();
        // Pure strafe at x=y keeps front-right and back-left stopped
        drive.move_robot(MotionIntent::new(0.5, 0.5, 0.0)).unwrap();
        assert!(drive.is_there_at_all(1.0).unwrap());
        assert!(!drive.is_there(1.0, 0.0, 0.0).unwrap());

        drive.move_robot(MotionIntent::new(0.0, 0.5, 0.0)).unwrap();
        assert!(!drive.is_there_at_all(1.0).unwrap());
    }

    #[test]
    fn test_reset_origin_zeroes_displacement() {
        let mut drive = sim_drive();
        drive.move_robot(MotionIntent::new(0.0, 1.0, 0.0)).unwrap();
        step(&mut drive);
        assert!(drive.displacement_y().unwrap() > 0.0);

        drive.reset_origin().unwrap();
        assert_eq!(drive.encoder_snapshot().unwrap(), EncoderSnapshot::default());
        assert_eq!(drive.displacement_y().unwrap(), 0.0);
        assert_eq!(drive.displacement_x().unwrap(), 0.0);
    }

    #[test]
    fn test_encoder_failure_is_reported() {
        let mut drive = sim_drive();
        drive.actuators_mut()[3].fail_reads(true);
        let err = drive.displacement_x().unwrap_err();
        match err {
            DriveError::Actuator { wheel, .. } => assert_eq!(wheel, WheelPosition::BackRight),
            other => panic!("unexpected error: {other}"),
        }
        assert!(drive.is_there(1.0, 0.0, 0.0).is_err());
    }
}
