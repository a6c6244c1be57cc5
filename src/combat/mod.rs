//! Combat plumbing shared by the graphical and headless simulations:
//! typed events, the event log, the simulation clock, speed control, and
//! the seeded RNG.

use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;

pub mod events;
pub mod log;

use events::*;
use log::{EventLog, LogEventKind};

/// Plugin wiring events, the event log, and the simulation clock.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Combat events
            .add_event::<DamageEvent>()
            .add_event::<BuffAppliedEvent>()
            .add_event::<BuffRemovedEvent>()
            .add_event::<ProjectileHitEvent>()
            .add_event::<TargetDeathEvent>()
            .add_event::<EffectFaultEvent>()
            // Resources
            .init_resource::<EventLog>()
            .init_resource::<SimulationSpeed>()
            .init_resource::<SimClock>()
            .init_resource::<GameRng>()
            // Systems
            .add_systems(PreUpdate, advance_sim_clock)
            .add_systems(PostUpdate, record_event_log);
    }
}

// ============================================================================
// Simulation clock & speed
// ============================================================================

/// The simulation's per-frame clock.
///
/// All timed systems (buff managers, projectile flight, visual pulses) read
/// `dt` and `elapsed` from here rather than from `Time` directly, so that the
/// speed multiplier and the headless fixed step apply uniformly.
#[derive(Resource, Default)]
pub struct SimClock {
    /// Scaled delta time for this frame, in seconds
    pub dt: f32,
    /// Scaled time since the simulation started, in seconds
    pub elapsed: f32,
    /// When set, `dt` ignores wall-clock time and advances by this step
    /// every frame (used by the headless runner for reproducibility)
    pub fixed_step: Option<f32>,
}

/// Controls the speed of the simulation
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 1.0 = normal, 2.0 = double)
    pub multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn normal_speed(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn double_speed(&mut self) {
        self.multiplier = 2.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }
}

/// Pause check handed to buff managers so their timers freeze while the
/// simulation speed is set to zero.
pub fn sim_paused(world: &World) -> bool {
    world
        .get_resource::<SimulationSpeed>()
        .is_some_and(|speed| speed.is_paused())
}

/// Advance the simulation clock once per frame.
fn advance_sim_clock(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut clock: ResMut<SimClock>,
) {
    let raw = clock.fixed_step.unwrap_or_else(|| time.delta_secs());
    clock.dt = raw * speed.multiplier;
    clock.elapsed += clock.dt;
}

// ============================================================================
// Seeded RNG
// ============================================================================

/// Seeded random number generator for deterministic simulation.
///
/// When a seed is provided (e.g., via headless config), the same seed will
/// always produce the same run. Without a seed, uses system entropy.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

// ============================================================================
// Event log recording
// ============================================================================

fn name_of(names: &Query<&Name>, entity: Entity) -> String {
    names
        .get(entity)
        .map(|n| n.as_str().to_string())
        .unwrap_or_else(|_| format!("{:?}", entity))
}

/// Drain the frame's combat events into the event log.
#[allow(clippy::too_many_arguments)]
fn record_event_log(
    clock: Res<SimClock>,
    mut event_log: ResMut<EventLog>,
    names: Query<&Name>,
    mut damage: EventReader<DamageEvent>,
    mut hits: EventReader<ProjectileHitEvent>,
    mut buffs_applied: EventReader<BuffAppliedEvent>,
    mut buffs_removed: EventReader<BuffRemovedEvent>,
    mut deaths: EventReader<TargetDeathEvent>,
    mut faults: EventReader<EffectFaultEvent>,
) {
    event_log.sim_time = clock.elapsed;

    for ev in damage.read() {
        let message = format!(
            "{} takes {:.0} damage from {}",
            name_of(&names, ev.target),
            ev.amount,
            ev.label
        );
        event_log.log(LogEventKind::Damage, message);
    }

    for ev in hits.read() {
        let message = format!(
            "{} is struck by a projectile from {} for {:.0}",
            name_of(&names, ev.target),
            ev.source_id,
            ev.damage
        );
        event_log.log(LogEventKind::Hit, message);
    }

    for ev in buffs_applied.read() {
        let verb = if ev.refreshed { "refreshed" } else { "gains" };
        let duration = match ev.duration {
            Some(d) => format!("{:.1}s", d),
            None => "indefinite".to_string(),
        };
        let message = format!(
            "{} {} {} ({})",
            name_of(&names, ev.target),
            verb,
            ev.buff_id,
            duration
        );
        event_log.log(LogEventKind::BuffApplied, message);
    }

    for ev in buffs_removed.read() {
        let verb = match ev.reason {
            BuffRemovalReason::Expired => "fades from",
            BuffRemovalReason::Dismissed => "is removed from",
        };
        let message = format!("{} {} {}", ev.buff_id, verb, name_of(&names, ev.target));
        event_log.log(LogEventKind::BuffRemoved, message);
    }

    for ev in deaths.read() {
        let message = format!("{} has been destroyed", name_of(&names, ev.target));
        event_log.log(LogEventKind::Death, message);
    }

    for ev in faults.read() {
        let message = format!(
            "{} hook failed on {}: {}",
            ev.stage,
            name_of(&names, ev.target),
            ev.detail
        );
        event_log.log(LogEventKind::Fault, message);
    }
}
