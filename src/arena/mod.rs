//! The sandbox arena: a flat range with patrolling training dummies and
//! stationary projectile emitters. This is the thin host the effect engine
//! runs inside; the engine itself never looks past the entity fields and
//! primitives exposed through `EffectHost`.

use bevy::prelude::*;

pub mod emitter;
pub mod projectile;
pub mod render;
pub mod targets;

pub use emitter::Emitter;
pub use targets::{spawn_dummy, Dummy, Dying};

use crate::effects::registry::EffectSpec;
use crate::effects::EffectPhase;

/// Half-extent of the playable area; projectiles despawn past it.
pub const ARENA_HALF_SIZE: f32 = 24.0;

/// Core arena systems (movement, firing, flight, hit resolution, deaths).
/// Rendering is a separate plugin so the headless runner can skip it.
pub struct ArenaPlugin;

impl Plugin for ArenaPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                targets::drift_targets,
                targets::apply_impulses,
                emitter::fire_emitters,
                projectile::fly_projectiles,
                projectile::process_projectile_hits,
                targets::check_target_deaths,
            )
                .chain()
                .in_set(EffectPhase::Resolve),
        );
    }
}

/// Spawn the demo scene: three dummies and three emitters with distinct
/// effect loadouts so every handler fires within a few seconds.
pub fn setup_demo_scene(mut commands: Commands, settings: Res<crate::settings::SimSettings>) {
    let pace = settings.emitter_interval_scale.max(0.1);

    spawn_dummy(&mut commands, "dummy-north", Vec3::new(0.0, 0.0, -6.0), 160.0, 3.0, 5.0);
    spawn_dummy(&mut commands, "dummy-mid", Vec3::new(2.0, 0.0, 0.0), 140.0, 2.5, 4.0);
    spawn_dummy(&mut commands, "dummy-south", Vec3::new(-2.0, 0.0, 6.0), 180.0, 3.5, 6.0);

    commands.spawn((
        Name::new("emitter-ember"),
        Emitter::new(
            "emitter-ember",
            2.4 * pace,
            vec![
                EffectSpec::burn(3.0, 5.0, 1.0),
                EffectSpec::slow(0.3, 4.0),
            ],
        )
        .with_impact_damage(5.0)
        .with_tier(2),
        Transform::from_xyz(-16.0, 0.0, -10.0),
    ));

    commands.spawn((
        Name::new("emitter-ram"),
        Emitter::new("emitter-ram", 3.1 * pace, vec![EffectSpec::knockback(9.0)])
            .with_impact_damage(7.0)
            .with_projectile_speed(18.0),
        Transform::from_xyz(16.0, 0.0, 0.0),
    ));

    commands.spawn((
        Name::new("emitter-trick"),
        Emitter::new(
            "emitter-trick",
            2.8 * pace,
            vec![EffectSpec::ricochet(2), EffectSpec::pierce(2)],
        )
        .with_impact_damage(3.0)
        .with_projectile_speed(16.0),
        Transform::from_xyz(0.0, 0.0, 14.0),
    ));
}
