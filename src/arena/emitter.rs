//! Projectile emitters.
//!
//! An emitter fires a projectile carrying its effect loadout at the nearest
//! live dummy on a fixed cadence. The fire timer keeps its remainder across
//! frames so the cadence never drifts.

use bevy::prelude::*;

use crate::combat::SimClock;
use crate::effects::host::Health;
use crate::effects::pipeline::Projectile;
use crate::effects::registry::EffectSpec;

use super::targets::Dummy;

/// Height above the emitter's origin where projectiles spawn.
const MUZZLE_HEIGHT: f32 = 1.0;

/// A stationary turret with an effect loadout.
#[derive(Component, Debug)]
pub struct Emitter {
    /// Stable identity baked into every projectile, so buffs from this
    /// emitter merge on re-hit while other emitters stack independently.
    pub source_id: String,
    /// Seconds between shots.
    pub interval: f32,
    /// Countdown to the next shot.
    pub timer: f32,
    /// Projectile speed in units per second.
    pub projectile_speed: f32,
    /// Damage the hit itself applies, before effects.
    pub impact_damage: f32,
    /// Rarity tier forwarded to effect contexts.
    pub tier: u8,
    /// Effect descriptors attached to every shot, in declaration order.
    pub loadout: Vec<EffectSpec>,
}

impl Emitter {
    pub fn new(source_id: impl Into<String>, interval: f32, loadout: Vec<EffectSpec>) -> Self {
        Self {
            source_id: source_id.into(),
            interval,
            timer: interval,
            projectile_speed: 14.0,
            impact_damage: 4.0,
            tier: 1,
            loadout,
        }
    }

    pub fn with_projectile_speed(mut self, speed: f32) -> Self {
        self.projectile_speed = speed;
        self
    }

    pub fn with_impact_damage(mut self, damage: f32) -> Self {
        self.impact_damage = damage;
        self
    }

    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }
}

/// Fire every emitter whose timer elapsed at the nearest live dummy.
pub fn fire_emitters(
    clock: Res<SimClock>,
    mut commands: Commands,
    mut emitters: Query<(Entity, &Transform, &mut Emitter)>,
    targets: Query<(&Transform, &Health), With<Dummy>>,
) {
    let dt = clock.dt;
    for (emitter_entity, emitter_transform, mut emitter) in emitters.iter_mut() {
        emitter.timer -= dt;
        if emitter.timer > 0.0 {
            continue;
        }
        emitter.timer += emitter.interval;

        let origin = emitter_transform.translation;
        let Some(target_pos) = nearest_live_target(origin, &targets) else {
            continue;
        };
        let Some(direction) = (target_pos - origin).with_y(0.0).try_normalize() else {
            continue;
        };

        commands.spawn((
            Projectile::new(
                emitter.source_id.clone(),
                direction * emitter.projectile_speed,
                emitter.impact_damage,
            )
            .from_source(emitter_entity)
            .with_tier(emitter.tier)
            .with_effects(emitter.loadout.iter().cloned()),
            Transform::from_translation(origin + Vec3::Y * MUZZLE_HEIGHT),
        ));
    }
}

fn nearest_live_target(
    origin: Vec3,
    targets: &Query<(&Transform, &Health), With<Dummy>>,
) -> Option<Vec3> {
    targets
        .iter()
        .filter(|(_, health)| health.is_alive())
        .map(|(transform, _)| transform.translation)
        .min_by(|a, b| {
            a.distance_squared(origin)
                .total_cmp(&b.distance_squared(origin))
        })
}
