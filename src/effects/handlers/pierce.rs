//! Pierce: let the projectile pass through targets instead of despawning.
//!
//! Consumes one pass-through per distinct target, skipping targets the
//! projectile already went through in its current trajectory. Defers
//! entirely when a co-located ricochet redirected the projectile during
//! this same hit resolution; the bounce wins that hit.

use bevy::prelude::*;

use crate::effects::buff::EffectError;
use crate::effects::host::EffectHost;
use crate::effects::pipeline::Projectile;
use crate::effects::registry::{EffectContext, EffectHandler};

pub struct PierceHandler;

impl EffectHandler for PierceHandler {
    fn apply(
        &self,
        target: Entity,
        _ctx: &EffectContext,
        projectile: &mut Projectile,
        _host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        if projectile.just_bounced {
            return Some(Ok(()));
        }
        if projectile.has_hit(target) {
            return Some(Ok(()));
        }

        if projectile.pierces_left > 0 {
            projectile.pierces_left -= 1;
            projectile.record_hit(target);
            projectile.should_destroy_after_hit = false;
        } else {
            projectile.should_destroy_after_hit = true;
        }

        Some(Ok(()))
    }
}
