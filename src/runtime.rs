// 50 Hz drive loop over a simulated base
// Drives to one displacement target, stopping on arrival or when the move
// timeout expires, and optionally solves a vision target frame.

use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{LOOP_HZ, MOVE_TIMEOUT, RobotConfig};
use crate::messages::RunStatus;
use crate::motor::sim::{SimHeading, SimWheel};
use crate::motor::{DriveError, DriveTrain};
use crate::vision::{TargetSolution, VisionError, VisionTarget};

/// What the runtime should do
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: RobotConfig,
    /// Lateral target, inches
    pub x: f64,
    /// Forward target, inches
    pub y: f64,
    /// Arrival tolerance, ticks
    pub epsilon: f64,
    pub target: Option<VisionTarget>,
}

pub struct Runtime {
    drive: DriveTrain<SimWheel, SimHeading>,
    x: f64,
    y: f64,
    epsilon: f64,
    cycles: u64,
    max_cycles: u64,
}

impl Runtime {
    pub fn new(options: &RunOptions) -> Result<Self, DriveError> {
        let wheels = [
            SimWheel::default(),
            SimWheel::default(),
            SimWheel::default(),
            SimWheel::default(),
        ];
        let mut drive = DriveTrain::new(wheels, SimHeading::new(0.0), options.config.drive.clone())?;
        drive.reset_origin()?;

        Ok(Self {
            drive,
            x: options.x,
            y: options.y,
            epsilon: options.epsilon,
            cycles: 0,
            max_cycles: MOVE_TIMEOUT.as_millis() as u64 * LOOP_HZ / 1000,
        })
    }

    /// Run one control period; returns a status once the move is over
    fn cycle(&mut self) -> Result<Option<RunStatus>, DriveError> {
        if self.drive.is_there(self.epsilon, self.x, self.y)? {
            self.drive.stop()?;
            return Ok(Some(RunStatus::Arrived));
        }

        if self.cycles >= self.max_cycles {
            // Watchdog triggered - stop the robot
            warn!(
                "Move not complete after {} cycles, stopping robot",
                self.cycles
            );
            self.drive.stop()?;
            return Ok(Some(RunStatus::TimedOut));
        }

        self.drive.move_to_distance(self.x, self.y)?;
        for wheel in self.drive.actuators_mut() {
            wheel.step();
        }
        self.cycles += 1;
        Ok(None)
    }

    /// Net displacement so far, inches
    fn displacement(&mut self) -> Result<(f64, f64), DriveError> {
        Ok((self.drive.displacement_x()?, self.drive.displacement_y()?))
    }
}

/// Solve a vision frame against the configured camera and target size
pub fn solve_target(
    config: &RobotConfig,
    target: &VisionTarget,
) -> Result<TargetSolution, VisionError> {
    target.solve(&config.camera, &config.target)
}

pub async fn run(options: RunOptions) -> Result<RunStatus, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(target) = options.target {
        match solve_target(&options.config, &target) {
            Ok(solution) => info!("Target solution: {}", serde_json::to_string(&solution)?),
            Err(e) => warn!("Target frame discarded: {}", e),
        }
    }

    let mut runtime = Runtime::new(&options)?;
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, moving to x={:.2}in y={:.2}in (epsilon {} ticks)",
        LOOP_HZ, options.x, options.y, options.epsilon
    );

    let status = loop {
        tick.tick().await;
        if let Some(status) = runtime.cycle()? {
            break status;
        }
    };

    let (x, y) = runtime.displacement()?;
    info!(
        "Move finished ({}) after {} cycles: x={:.2}in y={:.2}in",
        serde_json::to_string(&status)?,
        runtime.cycles,
        x,
        y
    );
    Ok(status)
}
