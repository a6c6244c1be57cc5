//! Slow: multiplicative movement-speed reduction.
//!
//! Each slow contributes its factor to the target's shared slow list, so
//! simultaneous slows from different sources compose multiplicatively
//! (0.3 and 0.5 leave 0.7 * 0.5 = 0.35 of base speed). Removal drops the
//! entry and recomputes speed from the base-stat snapshot.

use bevy::prelude::*;

use crate::effects::buff::{Buff, BuffEffect, EffectError};
use crate::effects::host::{EffectHost, MAX_SLOW_FACTOR};
use crate::effects::manager::BuffManager;
use crate::effects::registry::{EffectContext, EffectHandler, InstallOutcome};
use crate::effects::vfx::{OverlayKind, TintSpec};

/// Icy blue, linear space.
const SLOW_TINT_COLOR: Vec3 = Vec3::new(0.25, 0.55, 0.95);
const SLOW_TINT_ALPHA: f32 = 0.35;

pub struct SlowHandler;

impl SlowHandler {
    fn install_slow(
        &self,
        target: Entity,
        ctx: &EffectContext,
        host: &mut EffectHost,
    ) -> Result<InstallOutcome, EffectError> {
        if !host.is_live(target) {
            return Ok(InstallOutcome::Declined);
        }
        let factor = (ctx.spec.magnitude * ctx.tier_scale()).clamp(0.0, MAX_SLOW_FACTOR);
        let buff_id = ctx.buff_id(ctx.spec.kind.tag());

        // Merge does not re-fire on_apply, so when this id is already
        // active we push the (possibly changed) factor into the shared
        // list ourselves after refreshing the buff.
        let refreshing = host
            .world()
            .get::<BuffManager>(target)
            .is_some_and(|m| m.contains(&buff_id));

        host.apply_buff(
            target,
            Buff::new(buff_id.clone(), "slow", BuffEffect::Slow { factor })
                .with_duration(ctx.spec.duration),
        )?;

        if refreshing {
            host.upsert_slow(target, &buff_id, factor)?;
            host.recompute_move_speed_from_manager(target)?;
        }

        host.apply_buff(
            target,
            Buff::new(
                ctx.buff_id("slow_vfx"),
                "slow_vfx",
                BuffEffect::Vfx {
                    tint: Some(TintSpec {
                        color: SLOW_TINT_COLOR,
                        alpha: SLOW_TINT_ALPHA,
                        pulse: None,
                    }),
                    overlay: Some(OverlayKind::Frost),
                },
            )
            .with_duration(ctx.spec.duration),
        )?;

        Ok(InstallOutcome::Installed)
    }
}

impl EffectHandler for SlowHandler {
    fn install(
        &self,
        target: Entity,
        ctx: &EffectContext,
        host: &mut EffectHost,
    ) -> Option<Result<InstallOutcome, EffectError>> {
        Some(self.install_slow(target, ctx, host))
    }
}
