//! Projectile flight and hit resolution.
//!
//! Projectiles fly in a straight line until they overlap a live dummy. A hit
//! applies the impact damage, runs the effect pipeline, and then despawns
//! the projectile unless its loadout (ricochet, pierce) decided otherwise.

use bevy::prelude::*;

use crate::combat::events::ProjectileHitEvent;
use crate::combat::SimClock;
use crate::effects::host::{EffectHost, Health};
use crate::effects::pipeline::{apply_effects, Projectile};

use super::targets::Dummy;
use super::ARENA_HALF_SIZE;

/// A projectile hits once it comes within this distance of a dummy's center.
const HIT_RADIUS: f32 = 0.9;
/// Vertical aim point on a dummy, roughly center mass.
const CENTER_MASS: f32 = 1.0;

/// Integrate projectile positions and expire the single-frame bounce flag.
pub fn fly_projectiles(
    clock: Res<SimClock>,
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Transform, &mut Projectile)>,
) {
    let dt = clock.dt;
    for (entity, mut transform, mut projectile) in projectiles.iter_mut() {
        // The bounce flag only covers the hit resolution it was set in.
        projectile.just_bounced = false;

        transform.translation += projectile.velocity * dt;

        let p = transform.translation;
        if p.x.abs() > ARENA_HALF_SIZE || p.z.abs() > ARENA_HALF_SIZE {
            commands.entity(entity).despawn_recursive();
        }
    }
}

/// Resolve projectile/dummy overlaps.
///
/// Runs as an exclusive system because the effect pipeline needs full world
/// access. Overlaps are collected first, then each hit is processed: impact
/// damage, hit event, effect loadout, and finally the destroy-or-survive
/// decision the handlers negotiated on the projectile.
pub fn process_projectile_hits(world: &mut World) {
    let mut hits: Vec<(Entity, Entity)> = Vec::new();
    {
        let mut projectiles = world.query::<(Entity, &Transform, &Projectile)>();
        let mut dummies = world.query_filtered::<(Entity, &Transform, &Health), With<Dummy>>();
        for (projectile_entity, projectile_transform, projectile) in projectiles.iter(world) {
            for (target_entity, target_transform, health) in dummies.iter(world) {
                if !health.is_alive() {
                    continue;
                }
                // Targets this projectile already passed through don't
                // re-trigger while it remains overlapping.
                if projectile.has_hit(target_entity) {
                    continue;
                }
                let aim_point = target_transform.translation + Vec3::Y * CENTER_MASS;
                if projectile_transform.translation.distance(aim_point) <= HIT_RADIUS {
                    hits.push((projectile_entity, target_entity));
                    break;
                }
            }
        }
    }

    for (projectile_entity, target_entity) in hits {
        let Some(projectile) = world.get::<Projectile>(projectile_entity) else {
            continue;
        };
        let impact_damage = projectile.impact_damage;
        let source = projectile.source;
        let source_id = projectile.source_id.clone();

        {
            let mut host = EffectHost::new(world);
            if !host.is_live(target_entity) {
                continue;
            }
            match host.deal_damage(target_entity, impact_damage, source, "Impact") {
                Ok(actual) => host.send(ProjectileHitEvent {
                    projectile: projectile_entity,
                    source_id,
                    target: target_entity,
                    damage: actual,
                }),
                Err(error) => {
                    debug!("impact damage skipped: {}", error);
                    continue;
                }
            }
        }

        apply_effects(world, projectile_entity, target_entity);

        let destroy = world
            .get::<Projectile>(projectile_entity)
            .is_none_or(|p| p.should_destroy_after_hit);
        if destroy {
            world.despawn(projectile_entity);
        }
    }
}
