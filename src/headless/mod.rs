//! Headless mode for automated testing
//!
//! This module provides functionality to run scripted scenarios without any
//! graphical output, on a fixed simulation step for reproducibility.
//!
//! ## Usage
//!
//! ```bash
//! # Run a headless scenario
//! cargo run --release -- --headless scenario.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "targets": [{ "name": "dummy-1", "health": 150, "position": [6.0, 0.0] }],
//!   "volleys": [{
//!     "at": 0.5,
//!     "source_id": "west-emitter",
//!     "origin": [-12.0, 0.0],
//!     "target": 0,
//!     "damage": 5.0,
//!     "effects": [{ "kind": "Burn", "magnitude": 3.0, "duration": 5.0 }]
//!   }],
//!   "duration_secs": 20,
//!   "seed": 42
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ScenarioConfig, TargetSpec, VolleySpec};
pub use runner::{run_headless_sim, HeadlessPlugin, SimResult, TargetOutcome};
