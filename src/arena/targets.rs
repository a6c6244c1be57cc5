//! Training dummies: the effect-receiving targets of the sandbox.
//!
//! Dummies pace along a short patrol line at their (possibly slowed)
//! movement speed, absorb impulses from knockbacks, and linger briefly as a
//! corpse when destroyed before despawning.

use bevy::prelude::*;

use crate::combat::events::TargetDeathEvent;
use crate::combat::{sim_paused, SimClock};
use crate::effects::host::{BodyColor, DelayedActions, Health, MoveSpeed, Stunned, Velocity};
use crate::effects::manager::BuffManager;
use crate::effects::vfx::overlay::OverlayArena;
use crate::effects::vfx::tint::TintCompositor;

/// Exponential damping applied to impulse velocity, per second.
const IMPULSE_DAMPING: f32 = 6.0;
/// Impulse speeds below this are zeroed out.
const IMPULSE_REST: f32 = 0.05;
/// How long a destroyed dummy lingers before despawning.
const CORPSE_LINGER_SECS: f32 = 1.2;

/// A patrolling practice target.
#[derive(Component, Debug)]
pub struct Dummy {
    /// Center of the patrol line.
    pub home: Vec3,
    /// Half-length of the patrol line along X.
    pub span: f32,
    /// Current patrol direction (+1 or -1).
    pub direction: f32,
}

/// Marker for a destroyed dummy waiting out its corpse linger.
#[derive(Component)]
pub struct Dying;

/// Spawn a dummy with a lazily-snapshotting buff manager already attached
/// and its pause check wired to the simulation speed.
pub fn spawn_dummy(
    commands: &mut Commands,
    name: &str,
    position: Vec3,
    health: f32,
    move_speed: f32,
    patrol_span: f32,
) -> Entity {
    commands
        .spawn((
            Name::new(name.to_string()),
            Dummy {
                home: position,
                span: patrol_span,
                direction: 1.0,
            },
            Health::new(health),
            MoveSpeed::new(move_speed),
            Velocity::default(),
            BodyColor {
                color: Color::srgb(0.6, 0.75, 0.6),
            },
            BuffManager::with_pause_check(sim_paused),
            Transform::from_translation(position),
        ))
        .id()
}

/// Pace dummies along their patrol lines. Stunned or dead dummies stand
/// still; slowed ones move at their recomputed speed.
pub fn drift_targets(
    clock: Res<SimClock>,
    mut dummies: Query<(
        &mut Transform,
        &mut Dummy,
        &MoveSpeed,
        &Health,
        Option<&Stunned>,
    )>,
) {
    let dt = clock.dt;
    for (mut transform, mut dummy, speed, health, stunned) in dummies.iter_mut() {
        if !health.is_alive() || stunned.is_some() {
            continue;
        }
        transform.translation.x += speed.current * dummy.direction * dt;
        if (transform.translation.x - dummy.home.x).abs() > dummy.span {
            let limit = dummy.home.x + dummy.span * dummy.direction;
            transform.translation.x = limit;
            dummy.direction = -dummy.direction;
        }
    }
}

/// Integrate and damp impulse velocity (knockback shoves).
pub fn apply_impulses(clock: Res<SimClock>, mut bodies: Query<(&mut Transform, &mut Velocity)>) {
    let dt = clock.dt;
    for (mut transform, mut velocity) in bodies.iter_mut() {
        if velocity.0 == Vec3::ZERO {
            continue;
        }
        transform.translation += velocity.0 * dt;
        velocity.0 *= (-IMPULSE_DAMPING * dt).exp();
        if velocity.0.length_squared() < IMPULSE_REST * IMPULSE_REST {
            velocity.0 = Vec3::ZERO;
        }
    }
}

/// Handle dummies whose health reached zero this frame.
///
/// Death tears everything down in one place: the buff manager is destroyed
/// and detached, and every visual handle bound to the target is force
/// released regardless of its reference count. The corpse lingers briefly
/// via a delayed action, then despawns.
pub fn check_target_deaths(world: &mut World) {
    let mut dummies =
        world.query_filtered::<(Entity, &Health), (With<Dummy>, Without<Dying>)>();
    let newly_dead: Vec<Entity> = dummies
        .iter(world)
        .filter(|(_, health)| !health.is_alive())
        .map(|(entity, _)| entity)
        .collect();

    for entity in newly_dead {
        world.send_event(TargetDeathEvent {
            target: entity,
            killer: None,
        });

        if let Some(mut manager) = world.get_mut::<BuffManager>(entity) {
            manager.destroy();
        }
        world.entity_mut(entity).remove::<BuffManager>();

        world
            .resource_mut::<TintCompositor>()
            .force_release_target(entity);
        let orphaned_nodes = world
            .resource_mut::<OverlayArena>()
            .force_release_target(entity);
        for node in orphaned_nodes {
            world.despawn(node);
        }

        world.entity_mut(entity).insert(Dying);
        world
            .resource_mut::<DelayedActions>()
            .schedule(CORPSE_LINGER_SECS, move |world| {
                world.despawn(entity);
            });
    }
}
