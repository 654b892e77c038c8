use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mecanum_targeting::config::{DEFAULT_EPSILON, RobotConfig};
use mecanum_targeting::runtime::{self, RunOptions};
use mecanum_targeting::vision::VisionTarget;

/// Drive a simulated mecanum base to a displacement and solve a vision target
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Robot configuration (JSON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lateral displacement, inches (positive = right)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f64,

    /// Forward displacement, inches
    #[arg(long, default_value_t = 24.0, allow_negative_numbers = true)]
    y: f64,

    /// Arrival tolerance, encoder ticks
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// Detected target rectangle as "offset,width,height" in pixels
    #[arg(long, value_parser = parse_target, allow_hyphen_values = true)]
    target: Option<VisionTarget>,
}

fn parse_target(s: &str) -> Result<VisionTarget, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [offset, width, height] => Ok(VisionTarget::new(*offset, *width, *height)),
        _ => Err(format!("expected offset,width,height, got {} values", values.len())),
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            match RobotConfig::load(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => RobotConfig::default(),
    };

    let options = RunOptions {
        config,
        x: args.x,
        y: args.y,
        epsilon: args.epsilon,
        target: args.target,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
