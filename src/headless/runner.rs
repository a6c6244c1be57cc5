//! Headless scenario execution.
//!
//! Runs a scenario without any graphical output on a fixed simulation step,
//! suitable for automated testing and batch analysis.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use serde::Serialize;
use std::time::Duration;

use crate::arena::{spawn_dummy, ArenaPlugin};
use crate::combat::log::{EventLog, LogEventKind};
use crate::combat::{CombatPlugin, GameRng, SimClock};
use crate::effects::pipeline::Projectile;
use crate::effects::EffectEnginePlugin;

use super::config::{ScenarioConfig, VolleySpec};

/// Fixed simulation step for headless runs: wall-clock time never leaks in,
/// so a seeded scenario reproduces exactly.
const HEADLESS_STEP: f32 = 1.0 / 60.0;

/// Result of a completed headless run.
#[derive(Debug, Clone, Serialize)]
pub struct SimResult {
    /// Simulation time at which the run ended
    pub completed_at: f32,
    /// Seed the run used (if deterministic)
    pub seed: Option<u64>,
    /// Per-target outcomes, in scenario order
    pub targets: Vec<TargetOutcome>,
    /// Event totals over the whole run
    pub events: EventCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub name: String,
    pub max_health: f32,
    /// Health remaining at run end (0 if destroyed)
    pub final_health: f32,
    pub survived: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventCounts {
    pub damage: usize,
    pub hits: usize,
    pub buffs_applied: usize,
    pub buffs_removed: usize,
    pub deaths: usize,
    pub faults: usize,
}

/// Tracks run state and collects the result.
#[derive(Resource)]
pub struct HeadlessState {
    pub duration: f32,
    pub output_path: Option<String>,
    pub complete: bool,
    pub result: Option<SimResult>,
}

/// Scenario targets by index, kept past their despawn so outcomes survive
/// corpse cleanup.
#[derive(Resource, Default)]
pub struct TargetRoster {
    pub entries: Vec<RosterEntry>,
}

pub struct RosterEntry {
    pub name: String,
    pub max_health: f32,
    pub entity: Entity,
}

/// Volleys not yet fired, in schedule order.
#[derive(Resource)]
struct VolleySchedule {
    remaining: Vec<VolleySpec>,
}

/// Plugin for headless scenario execution
pub struct HeadlessPlugin {
    pub config: ScenarioConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let mut remaining = self.config.volleys.clone();
        remaining.sort_by(|a, b| a.at.total_cmp(&b.at));

        app.insert_resource(self.config.clone())
            .insert_resource(HeadlessState {
                duration: self.config.duration_secs,
                output_path: self.config.output_path.clone(),
                complete: false,
                result: None,
            })
            .insert_resource(VolleySchedule { remaining })
            .init_resource::<TargetRoster>()
            .add_systems(Startup, headless_setup)
            .add_systems(Update, fire_scheduled_volleys)
            .add_systems(Last, (headless_check_end, headless_exit_on_complete).chain());
    }
}

/// Seed the RNG, pin the clock to the fixed step, and spawn the scenario's
/// dummies.
fn headless_setup(world: &mut World) {
    let config = world.resource::<ScenarioConfig>().clone();

    world.resource_mut::<SimClock>().fixed_step = Some(HEADLESS_STEP);

    let rng = match config.seed {
        Some(seed) => {
            info!("using deterministic RNG with seed {}", seed);
            GameRng::from_seed(seed)
        }
        None => {
            info!("using non-deterministic RNG (no seed provided)");
            GameRng::from_entropy()
        }
    };
    world.insert_resource(rng);

    {
        let mut log = world.resource_mut::<EventLog>();
        log.clear();
        log.log(LogEventKind::SimEvent, "Scenario started".to_string());
    }

    let mut entries = Vec::new();
    {
        let mut commands = world.commands();
        for target in &config.targets {
            let position = Vec3::new(target.position[0], 0.0, target.position[1]);
            let entity = spawn_dummy(
                &mut commands,
                &target.name,
                position,
                target.health,
                target.move_speed,
                target.patrol_span,
            );
            entries.push(RosterEntry {
                name: target.name.clone(),
                max_health: target.health,
                entity,
            });
        }
    }
    world.flush();
    world.resource_mut::<TargetRoster>().entries = entries;

    info!(
        "headless setup complete: {} targets, {} scheduled volleys",
        config.targets.len(),
        config.volleys.len()
    );
}

/// Fire every volley whose scheduled time has arrived.
fn fire_scheduled_volleys(
    clock: Res<SimClock>,
    mut commands: Commands,
    mut schedule: ResMut<VolleySchedule>,
    mut event_log: ResMut<EventLog>,
    roster: Res<TargetRoster>,
    transforms: Query<&Transform>,
) {
    while let Some(volley) = schedule.remaining.first() {
        if volley.at > clock.elapsed {
            break;
        }
        let volley = schedule.remaining.remove(0);

        let Some(entry) = roster.entries.get(volley.target) else {
            continue;
        };
        let origin = Vec3::new(volley.origin[0], 1.0, volley.origin[1]);
        let Ok(target_transform) = transforms.get(entry.entity) else {
            event_log.log(
                LogEventKind::SimEvent,
                format!("volley from {} skipped: {} is gone", volley.source_id, entry.name),
            );
            continue;
        };
        let Some(direction) = (target_transform.translation - origin)
            .with_y(0.0)
            .try_normalize()
        else {
            continue;
        };

        event_log.log(
            LogEventKind::SimEvent,
            format!("{} fires at {}", volley.source_id, entry.name),
        );
        commands.spawn((
            Projectile::new(volley.source_id.clone(), direction * volley.speed, volley.damage)
                .with_tier(volley.tier)
                .with_effects(volley.effects.iter().cloned()),
            Transform::from_translation(origin),
        ));
    }
}

/// End the run once the duration elapses or every target is destroyed.
fn headless_check_end(
    clock: Res<SimClock>,
    rng: Res<GameRng>,
    mut state: ResMut<HeadlessState>,
    mut event_log: ResMut<EventLog>,
    roster: Res<TargetRoster>,
    healths: Query<&crate::effects::host::Health>,
) {
    if state.complete {
        return;
    }

    let any_alive = roster
        .entries
        .iter()
        .any(|entry| healths.get(entry.entity).is_ok_and(|h| h.is_alive()));

    if clock.elapsed < state.duration && any_alive {
        return;
    }

    event_log.log(
        LogEventKind::SimEvent,
        format!("Scenario ended at {:.2}s", clock.elapsed),
    );

    let targets = roster
        .entries
        .iter()
        .map(|entry| {
            let final_health = healths
                .get(entry.entity)
                .map(|h| h.current)
                .unwrap_or(0.0);
            TargetOutcome {
                name: entry.name.clone(),
                max_health: entry.max_health,
                final_health,
                survived: final_health > 0.0,
            }
        })
        .collect();

    let result = SimResult {
        completed_at: clock.elapsed,
        seed: rng.seed,
        targets,
        events: EventCounts {
            damage: event_log.count_of(LogEventKind::Damage),
            hits: event_log.count_of(LogEventKind::Hit),
            buffs_applied: event_log.count_of(LogEventKind::BuffApplied),
            buffs_removed: event_log.count_of(LogEventKind::BuffRemoved),
            deaths: event_log.count_of(LogEventKind::Death),
            faults: event_log.count_of(LogEventKind::Fault),
        },
    };

    if let Some(path) = &state.output_path {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => println!("Run complete. Result saved to: {}", path),
                Err(e) => eprintln!("Failed to write result file: {}", e),
            },
            Err(e) => eprintln!("Failed to serialize result: {}", e),
        }
    }

    state.result = Some(result);
    state.complete = true;
}

/// Exit the app when the run is complete.
fn headless_exit_on_complete(state: Res<HeadlessState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

/// Run a scenario to completion and return its result.
pub fn run_headless_sim(config: ScenarioConfig) -> Result<SimResult, String> {
    config.validate()?;

    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)),
    )
    .add_plugins(TransformPlugin)
    .add_plugins((CombatPlugin, EffectEnginePlugin, ArenaPlugin))
    .add_plugins(HeadlessPlugin { config });

    app.run();

    let mut state = app.world_mut().resource_mut::<HeadlessState>();
    state
        .result
        .take()
        .ok_or_else(|| "run ended without producing a result".to_string())
}
