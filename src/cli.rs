//! Command-line interface for VolleySim
//!
//! Supports both graphical (default) and headless modes.

use clap::Parser;
use std::path::PathBuf;

/// Projectile volley and status-effect sandbox
#[derive(Parser, Debug)]
#[command(name = "volleysim")]
#[command(about = "Projectile volley and status-effect sandbox")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON scenario file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the run result (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Override the scenario's random seed (headless mode only)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the scenario's duration in seconds (headless mode only)
    #[arg(long)]
    pub max_duration: Option<f32>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
