//! VolleySim - Projectile Volley & Status-Effect Sandbox
//!
//! Graphical by default; `--headless <scenario.json>` runs a scripted
//! scenario on a fixed step and prints the result.

use bevy::prelude::*;
use bevy::window::PresentMode;

use volleysim::arena::render::ArenaRenderPlugin;
use volleysim::arena::{self, ArenaPlugin};
use volleysim::combat::{CombatPlugin, SimulationSpeed};
use volleysim::effects::EffectEnginePlugin;
use volleysim::headless::{run_headless_sim, ScenarioConfig};
use volleysim::settings::SimSettings;
use volleysim::cli;

fn main() {
    let args = cli::parse_args();

    if let Some(scenario_path) = args.headless {
        let mut config = match ScenarioConfig::load_from_file(&scenario_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load scenario: {}", e);
                std::process::exit(1);
            }
        };
        if let Some(output) = args.output {
            config.output_path = Some(output.display().to_string());
        }
        if let Some(seed) = args.seed {
            config.seed = Some(seed);
        }
        if let Some(duration) = args.max_duration {
            config.duration_secs = duration;
        }

        match run_headless_sim(config) {
            Ok(result) => {
                println!(
                    "Scenario finished at {:.2}s: {}/{} targets survived, {} hits, {} buffs applied",
                    result.completed_at,
                    result.targets.iter().filter(|t| t.survived).count(),
                    result.targets.len(),
                    result.events.hits,
                    result.events.buffs_applied,
                );
            }
            Err(e) => {
                eprintln!("Scenario failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let settings = SimSettings::load();
    let present_mode = if settings.vsync {
        PresentMode::AutoVsync
    } else {
        PresentMode::AutoNoVsync
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "VolleySim".to_string(),
                resolution: (1280.0, 720.0).into(),
                present_mode,
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .insert_resource(SimulationSpeed {
            multiplier: settings.simulation_speed,
        })
        .insert_resource(settings)
        .add_plugins((CombatPlugin, EffectEnginePlugin, ArenaPlugin, ArenaRenderPlugin))
        .add_systems(Startup, arena::setup_demo_scene)
        .run();
}
