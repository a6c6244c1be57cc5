//! Effect handler registry.
//!
//! Effect types form a closed set ([`EffectKind`]) resolved through a
//! registry built at startup, so dispatch is exhaustive rather than
//! stringly-typed. Each handler exposes up to two capabilities:
//!
//! - `install`: persistent, buff-backed. Idempotent under merge: installing
//!   twice with the same derived buff id refreshes instead of stacking.
//! - `apply`: immediate one-shot. Mutates target/projectile state directly
//!   and returns no handle.
//!
//! The application pipeline tries `install` first and falls back to `apply`
//! when install is unsupported, declines, or fails.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::buff::EffectError;
use super::handlers;
use super::host::EffectHost;
use super::pipeline::Projectile;

/// The closed set of effect types a projectile can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Burn,
    Slow,
    Knockback,
    Ricochet,
    Pierce,
}

impl EffectKind {
    /// Tag used to derive buff ids and log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            EffectKind::Burn => "burn",
            EffectKind::Slow => "slow",
            EffectKind::Knockback => "knockback",
            EffectKind::Ricochet => "ricochet",
            EffectKind::Pierce => "pierce",
        }
    }
}

fn default_tick_interval() -> f32 {
    1.0
}

fn default_spread_degrees() -> f32 {
    30.0
}

/// One effect descriptor attached to a projectile, loaded from config or
/// built in code. Field meaning depends on `kind`:
/// - Burn: `magnitude` = damage per tick, `duration`, `tick_interval`
/// - Slow: `magnitude` = reduction fraction (0.3 = 30% slower), `duration`
/// - Knockback: `magnitude` = impulse strength
/// - Ricochet: `bounces`, `spread_degrees`
/// - Pierce: `pierces` = pass-throughs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    #[serde(default)]
    pub magnitude: f32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f32,
    #[serde(default)]
    pub bounces: u32,
    #[serde(default)]
    pub pierces: u32,
    #[serde(default = "default_spread_degrees")]
    pub spread_degrees: f32,
}

impl EffectSpec {
    fn base(kind: EffectKind) -> Self {
        Self {
            kind,
            magnitude: 0.0,
            duration: 0.0,
            tick_interval: default_tick_interval(),
            bounces: 0,
            pierces: 0,
            spread_degrees: default_spread_degrees(),
        }
    }

    pub fn burn(damage_per_tick: f32, duration: f32, tick_interval: f32) -> Self {
        Self {
            magnitude: damage_per_tick,
            duration,
            tick_interval,
            ..Self::base(EffectKind::Burn)
        }
    }

    pub fn slow(factor: f32, duration: f32) -> Self {
        Self {
            magnitude: factor,
            duration,
            ..Self::base(EffectKind::Slow)
        }
    }

    pub fn knockback(strength: f32) -> Self {
        Self {
            magnitude: strength,
            ..Self::base(EffectKind::Knockback)
        }
    }

    pub fn ricochet(bounces: u32) -> Self {
        Self {
            bounces,
            ..Self::base(EffectKind::Ricochet)
        }
    }

    pub fn pierce(pierces: u32) -> Self {
        Self {
            pierces,
            ..Self::base(EffectKind::Pierce)
        }
    }
}

/// Resolved parameters for one effect application. Ephemeral: built per
/// effect per hit, never stored.
#[derive(Clone, Debug)]
pub struct EffectContext {
    /// Entity that fired the projectile, if still around.
    pub source: Option<Entity>,
    /// Stable identity of the source, used to derive buff ids so repeated
    /// hits from one source merge while different sources stack.
    pub source_id: String,
    /// Rarity tier scaling the effect's magnitudes (1 = baseline).
    pub tier: u8,
    /// The owning projectile entity.
    pub projectile: Entity,
    /// The effect descriptor being applied.
    pub spec: EffectSpec,
}

impl EffectContext {
    /// Deterministic buff id for this source + effect tag.
    pub fn buff_id(&self, tag: &str) -> String {
        format!("{}:{}", self.source_id, tag)
    }

    /// Magnitude multiplier for the context's rarity tier.
    pub fn tier_scale(&self) -> f32 {
        1.0 + 0.25 * self.tier.saturating_sub(1) as f32
    }
}

/// Result of a handler's `install` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The effect is now tracked as a buff on the target.
    Installed,
    /// The handler chose not to install; the pipeline falls through to
    /// `apply`.
    Declined,
    /// Resolution arrives on a later frame; the pipeline parks the request
    /// in [`PendingInstalls`](super::pipeline::PendingInstalls).
    Deferred,
}

/// Two-capability effect handler. Both methods return `None` when the
/// handler does not support that capability.
pub trait EffectHandler: Send + Sync {
    /// Persistent, buff-backed application.
    fn install(
        &self,
        _target: Entity,
        _ctx: &EffectContext,
        _host: &mut EffectHost,
    ) -> Option<Result<InstallOutcome, EffectError>> {
        None
    }

    /// Immediate one-shot application.
    fn apply(
        &self,
        _target: Entity,
        _ctx: &EffectContext,
        _projectile: &mut Projectile,
        _host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        None
    }
}

/// Handler lookup table, built once at startup.
#[derive(Resource)]
pub struct EffectRegistry {
    handlers: HashMap<EffectKind, Box<dyn EffectHandler>>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.set_handler(EffectKind::Burn, Box::new(handlers::burn::BurnHandler));
        registry.set_handler(EffectKind::Slow, Box::new(handlers::slow::SlowHandler));
        registry.set_handler(
            EffectKind::Knockback,
            Box::new(handlers::knockback::KnockbackHandler),
        );
        registry.set_handler(
            EffectKind::Ricochet,
            Box::new(handlers::ricochet::RicochetHandler),
        );
        registry.set_handler(EffectKind::Pierce, Box::new(handlers::pierce::PierceHandler));
        registry
    }
}

impl EffectRegistry {
    pub fn handler_for(&self, kind: EffectKind) -> Option<&dyn EffectHandler> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    /// Replace (or remove and re-add) the handler for a kind. Used by tests
    /// to exercise failure and deferral paths.
    pub fn set_handler(&mut self, kind: EffectKind, handler: Box<dyn EffectHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Drop the handler for a kind entirely. Hits carrying that effect are
    /// then skipped with a log line.
    pub fn clear_handler(&mut self, kind: EffectKind) {
        self.handlers.remove(&kind);
    }
}
