//! Burn: periodic damage over a bounded duration.
//!
//! Installs a ticking damage buff plus a shared ember tint and flame icon.
//! Re-hits from the same source refresh the timers instead of stacking a
//! second burn; hits from different sources burn independently.

use bevy::prelude::*;

use crate::effects::buff::{Buff, BuffEffect, EffectError};
use crate::effects::host::EffectHost;
use crate::effects::registry::{EffectContext, EffectHandler, InstallOutcome};
use crate::effects::vfx::{OverlayKind, Pulse, TintSpec};

/// Ember orange, linear space.
const BURN_TINT_COLOR: Vec3 = Vec3::new(0.95, 0.35, 0.08);
const BURN_TINT_ALPHA: f32 = 0.45;

pub struct BurnHandler;

impl BurnHandler {
    fn install_burn(
        &self,
        target: Entity,
        ctx: &EffectContext,
        host: &mut EffectHost,
    ) -> Result<InstallOutcome, EffectError> {
        if !host.is_live(target) {
            return Ok(InstallOutcome::Declined);
        }
        let damage_per_tick = ctx.spec.magnitude * ctx.tier_scale();
        let duration = ctx.spec.duration;

        host.apply_buff(
            target,
            Buff::new(
                ctx.buff_id(ctx.spec.kind.tag()),
                "burn",
                BuffEffect::Burn {
                    damage_per_tick,
                    source: ctx.source,
                },
            )
            .with_duration(duration)
            .with_tick_interval(ctx.spec.tick_interval),
        )?;

        host.apply_buff(
            target,
            Buff::new(
                ctx.buff_id("burn_vfx"),
                "burn_vfx",
                BuffEffect::Vfx {
                    tint: Some(TintSpec {
                        color: BURN_TINT_COLOR,
                        alpha: BURN_TINT_ALPHA,
                        pulse: Some(Pulse {
                            frequency: 2.2,
                            amplitude: 0.35,
                            baseline: 0.8,
                        }),
                    }),
                    overlay: Some(OverlayKind::Flame),
                },
            )
            .with_duration(duration),
        )?;

        Ok(InstallOutcome::Installed)
    }
}

impl EffectHandler for BurnHandler {
    fn install(
        &self,
        target: Entity,
        ctx: &EffectContext,
        host: &mut EffectHost,
    ) -> Option<Result<InstallOutcome, EffectError>> {
        Some(self.install_burn(target, ctx, host))
    }

    /// One-shot fallback: a single scorch worth one tick of damage, so a
    /// failed install still produces the immediate feedback of the hit.
    fn apply(
        &self,
        target: Entity,
        ctx: &EffectContext,
        _projectile: &mut crate::effects::pipeline::Projectile,
        host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        let damage = ctx.spec.magnitude * ctx.tier_scale();
        Some(
            host.deal_damage(target, damage, ctx.source, "Scorch")
                .map(|_| ()),
        )
    }
}
