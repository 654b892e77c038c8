// Per-robot calibration constants for the mecanum drive train
//
// Loaded once from configuration and never mutated by the engine.

use serde::{Deserialize, Serialize};

use super::actuator::{ClosedLoopConfig, FeedbackDevice, WheelPosition};
use super::ControlMode;
use crate::config::NOMINAL_BATTERY_VOLTAGE;

/// Feed-forward and PID gains loaded into each actuator's closed loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PidGains {
    pub f: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

/// Gains and output limit for one closed-loop mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopParams {
    pub gains: PidGains,
    /// Symmetric peak output, volts
    pub peak_output_voltage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    pub ticks_per_inch_forward: f64,
    pub ticks_per_inch_lateral: f64,
    pub ticks_per_radian: f64,
    /// Multiplier applied to every velocity-mode command after rescaling
    pub max_speed: f64,
    /// Proportional gain from heading error (degrees) to rotation command
    pub heading_gain: f64,
    pub velocity: LoopParams,
    pub position: LoopParams,
    pub open_loop_peak_voltage: f64,
    pub encoder_codes_per_rev: u32,
    /// Closed-loop ramp rate, volts per second
    pub closed_loop_ramp_rate: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            ticks_per_inch_forward: 212.2,
            ticks_per_inch_lateral: 240.0,
            ticks_per_radian: 2546.0,
            max_speed: 1.0,
            heading_gain: 0.02,
            velocity: LoopParams {
                gains: PidGains {
                    f: 0.1597,
                    p: 0.42,
                    i: 0.0,
                    d: 0.0,
                },
                peak_output_voltage: 12.0,
            },
            position: LoopParams {
                gains: PidGains {
                    f: 0.0,
                    p: 0.0025,
                    i: 0.0,
                    d: 0.0,
                },
                peak_output_voltage: 6.0,
            },
            open_loop_peak_voltage: 12.0,
            encoder_codes_per_rev: 1000,
            closed_loop_ramp_rate: 38.0,
        }
    }
}

impl CalibrationConstants {
    /// Largest normalized command displacement control may emit on any wheel
    pub fn max_position_command(&self) -> f64 {
        self.position.peak_output_voltage / NOMINAL_BATTERY_VOLTAGE
    }

    /// Build the closed-loop parameters a wheel needs to run in `mode`
    ///
    /// Right-side encoders are mounted mirrored, so their sensors are reversed.
    pub fn closed_loop_config(&self, mode: ControlMode, wheel: WheelPosition) -> ClosedLoopConfig {
        let (gains, peak) = match mode {
            ControlMode::VelocityClosedLoop => {
                (Some(self.velocity.gains), self.velocity.peak_output_voltage)
            }
            ControlMode::PositionClosedLoop => {
                (Some(self.position.gains), self.position.peak_output_voltage)
            }
            ControlMode::OpenLoopVoltage => (None, self.open_loop_peak_voltage),
        };

        ClosedLoopConfig {
            mode,
            gains,
            nominal_output_voltage: 0.0,
            peak_output_voltage: peak,
            ramp_rate: gains.map(|_| self.closed_loop_ramp_rate),
            feedback: gains.map(|_| FeedbackDevice {
                codes_per_rev: self.encoder_codes_per_rev,
                sensor_reversed: wheel.is_right(),
                soft_limits_enabled: false,
            }),
        }
    }
}
