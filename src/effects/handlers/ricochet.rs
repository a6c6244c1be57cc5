//! Ricochet: reflect the projectile off the surface it just struck.
//!
//! The reflection is perturbed by a uniformly random angle within ± half
//! the configured spread and bounded by the projectile's bounce counter.
//! A successful bounce raises `just_bounced` for the rest of this hit
//! resolution so a co-located pierce defers, and clears the pierce dedup
//! memory since the trajectory changed.

use bevy::prelude::*;

use crate::effects::buff::EffectError;
use crate::effects::host::EffectHost;
use crate::effects::pipeline::Projectile;
use crate::effects::registry::{EffectContext, EffectHandler};

pub struct RicochetHandler;

impl RicochetHandler {
    fn apply_ricochet(
        &self,
        target: Entity,
        ctx: &EffectContext,
        projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Result<(), EffectError> {
        if projectile.bounces_left == 0 {
            projectile.should_destroy_after_hit = true;
            return Ok(());
        }

        let Some(target_pos) = host.position(target) else {
            return Err(EffectError::TargetGone(target));
        };
        let Some(projectile_pos) = host.position(ctx.projectile) else {
            return Err(EffectError::TargetGone(ctx.projectile));
        };

        // Surface normal approximated from the impact geometry: from the
        // target's center toward the point of impact.
        let normal = (projectile_pos - target_pos)
            .with_y(0.0)
            .try_normalize()
            .unwrap_or_else(|| -projectile.velocity.normalize_or_zero());

        let reflected = projectile.velocity - 2.0 * projectile.velocity.dot(normal) * normal;
        let spread = ctx.spec.spread_degrees.to_radians();
        let perturbation = (host.random_f32() - 0.5) * spread;
        projectile.velocity = Quat::from_rotation_y(perturbation) * reflected;

        projectile.bounces_left -= 1;
        projectile.just_bounced = true;
        projectile.forget_hits();
        projectile.should_destroy_after_hit = false;

        Ok(())
    }
}

impl EffectHandler for RicochetHandler {
    fn apply(
        &self,
        target: Entity,
        ctx: &EffectContext,
        projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        Some(self.apply_ricochet(target, ctx, projectile, host))
    }
}
