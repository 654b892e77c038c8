// Simulated wheel and heading sensor
//
// A first-order plant: every control period each wheel advances by its last
// command times `max_ticks_per_cycle`, whatever the mode. Good enough to close
// the displacement loop in tests and in the runtime without hardware. Absolute
// position setpoints (as emitted by `rotate`) are not modelled.

use tracing::debug;

use super::ControlMode;
use super::actuator::{
    ActuatorError, ClosedLoopConfig, HeadingSensor, SensorError, WheelActuator,
};

/// Default plant speed: ticks travelled per period at full command
pub const DEFAULT_MAX_TICKS_PER_CYCLE: f64 = 200.0;

#[derive(Debug, Clone)]
pub struct SimWheel {
    max_ticks_per_cycle: f64,
    position: f64,
    command: f64,
    config: Option<ClosedLoopConfig>,
    configure_count: usize,
    reject_configure: bool,
    fail_reads: bool,
}

impl Default for SimWheel {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TICKS_PER_CYCLE)
    }
}

impl SimWheel {
    pub fn new(max_ticks_per_cycle: f64) -> Self {
        Self {
            max_ticks_per_cycle,
            position: 0.0,
            command: 0.0,
            config: None,
            configure_count: 0,
            reject_configure: false,
            fail_reads: false,
        }
    }

    /// Advance the plant by one control period
    pub fn step(&mut self) {
        self.position += self.command * self.max_ticks_per_cycle;
    }

    /// Last value written with `set`
    pub fn command(&self) -> f64 {
        self.command
    }

    /// Mode of the last accepted configuration
    pub fn mode(&self) -> Option<ControlMode> {
        self.config.map(|c| c.mode)
    }

    pub fn config(&self) -> Option<&ClosedLoopConfig> {
        self.config.as_ref()
    }

    /// Number of accepted reconfigurations
    pub fn configure_count(&self) -> usize {
        self.configure_count
    }

    /// Make subsequent `configure` calls fail
    pub fn reject_configure(&mut self, reject: bool) {
        self.reject_configure = reject;
    }

    /// Make subsequent encoder reads fail
    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_position(&mut self, ticks: f64) {
        self.position = ticks;
    }

    fn check_reads(&self) -> Result<(), ActuatorError> {
        if self.fail_reads {
            return Err(ActuatorError::ReadFailed("simulated encoder fault".to_string()));
        }
        Ok(())
    }
}

impl WheelActuator for SimWheel {
    fn set(&mut self, value: f64) -> Result<(), ActuatorError> {
        self.command = value;
        Ok(())
    }

    fn position(&mut self) -> Result<i32, ActuatorError> {
        self.check_reads()?;
        Ok(self.position.round() as i32)
    }

    fn zero_position(&mut self) -> Result<(), ActuatorError> {
        self.position = 0.0;
        Ok(())
    }

    fn velocity(&mut self) -> Result<i32, ActuatorError> {
        self.check_reads()?;
        Ok((self.command * self.max_ticks_per_cycle).round() as i32)
    }

    fn configure(&mut self, config: &ClosedLoopConfig) -> Result<(), ActuatorError> {
        if self.reject_configure {
            return Err(ActuatorError::Rejected("simulated configuration fault".to_string()));
        }
        debug!("Sim wheel configured for {:?}", config.mode);
        self.config = Some(*config);
        self.configure_count += 1;
        Ok(())
    }
}

/// Heading sensor that reports whatever it was last told
#[derive(Debug, Clone)]
pub struct SimHeading {
    degrees: f64,
    available: bool,
}

impl SimHeading {
    pub fn new(degrees: f64) -> Self {
        Self {
            degrees,
            available: true,
        }
    }

    pub fn set_heading(&mut self, degrees: f64) {
        self.degrees = degrees;
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl HeadingSensor for SimHeading {
    fn heading(&mut self) -> Result<f64, SensorError> {
        if !self.available {
            return Err(SensorError::Unavailable);
        }
        Ok(self.degrees)
    }
}
