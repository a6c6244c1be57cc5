//! Knockback: an immediate impulse away from the source, plus a short stun.
//!
//! Pure one-shot: a re-hit pushes again rather than extending anything, so
//! there is no install capability. The stun rides on a regular buff and the
//! stars icon shares the overlay ref-count with any other stun source.

use bevy::prelude::*;

use crate::effects::buff::{Buff, BuffEffect, EffectError};
use crate::effects::host::EffectHost;
use crate::effects::pipeline::Projectile;
use crate::effects::registry::{EffectContext, EffectHandler};
use crate::effects::vfx::OverlayKind;

/// Duration of the stun that accompanies the impulse.
const KNOCKBACK_STUN_SECS: f32 = 0.35;

pub struct KnockbackHandler;

impl KnockbackHandler {
    fn apply_knockback(
        &self,
        target: Entity,
        ctx: &EffectContext,
        projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Result<(), EffectError> {
        let Some(target_pos) = host.position(target) else {
            return Err(EffectError::TargetGone(target));
        };

        // Push directly away from the source; if the source is already gone,
        // push along the projectile's line of flight.
        let away = ctx
            .source
            .and_then(|source| host.position(source))
            .map(|source_pos| target_pos - source_pos)
            .unwrap_or(projectile.velocity);
        let direction = away.with_y(0.0).try_normalize().unwrap_or(Vec3::X);

        let strength = ctx.spec.magnitude * ctx.tier_scale();
        host.apply_impulse(target, direction * strength)?;

        host.apply_buff(
            target,
            Buff::new(ctx.buff_id("knockback_stun"), "knockback_stun", BuffEffect::Stun)
                .with_duration(KNOCKBACK_STUN_SECS),
        )?;
        host.apply_buff(
            target,
            Buff::new(
                ctx.buff_id("stun_vfx"),
                "stun_vfx",
                BuffEffect::Vfx {
                    tint: None,
                    overlay: Some(OverlayKind::Stars),
                },
            )
            .with_duration(KNOCKBACK_STUN_SECS),
        )?;

        Ok(())
    }
}

impl EffectHandler for KnockbackHandler {
    fn apply(
        &self,
        target: Entity,
        ctx: &EffectContext,
        projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        Some(self.apply_knockback(target, ctx, projectile, host))
    }
}
