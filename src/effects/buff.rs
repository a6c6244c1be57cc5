//! Buff instances and their effect payloads.
//!
//! A `Buff` is one active, timed modifier on a target: a unique id, optional
//! duration, optional periodic tick cadence, and an effect payload describing
//! what the buff does. The payload is a closed set of variants so adding a new
//! effect forces every dispatch site to handle it.

use bevy::prelude::*;
use thiserror::Error;

use super::host::EffectHost;
use super::manager::BaseStats;
use super::vfx::overlay::OverlayKind;
use super::vfx::tint::TintSpec;

/// Failure reported by a buff hook or an effect handler.
///
/// Hooks may legitimately fail (a target removed mid-frame, a missing
/// component); callers log and contain the failure rather than unwinding.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("target {0:?} is no longer live")]
    TargetGone(Entity),
    #[error("{entity:?} is missing {component}")]
    MissingState {
        entity: Entity,
        component: &'static str,
    },
    #[error("{0}")]
    Failed(String),
}

/// One active, timed modifier instance. Owned exclusively by the
/// [`BuffManager`](super::manager::BuffManager) of a single target.
#[derive(Clone, Debug)]
pub struct Buff {
    /// Unique within one manager; re-applying the same id merges instead of
    /// stacking a duplicate.
    pub id: String,
    /// Semantic tag, e.g. "burn", "slow", "knockback_stun", "burn_vfx".
    pub kind: &'static str,
    /// Lifetime in seconds. `None` = active until manually removed.
    pub duration: Option<f32>,
    /// Seconds since (re)application.
    pub elapsed: f32,
    /// Periodic callback cadence in seconds, if any.
    pub tick_interval: Option<f32>,
    /// Accumulator toward the next tick, independent of `elapsed`.
    pub elapsed_tick: f32,
    /// What the buff does while active.
    pub effect: BuffEffect,
}

impl Buff {
    pub fn new(id: impl Into<String>, kind: &'static str, effect: BuffEffect) -> Self {
        Self {
            id: id.into(),
            kind,
            duration: None,
            elapsed: 0.0,
            tick_interval: None,
            elapsed_tick: 0.0,
            effect,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_tick_interval(mut self, seconds: f32) -> Self {
        self.tick_interval = Some(seconds);
        self
    }

    /// Seconds until natural expiry, if the buff is duration-bounded.
    pub fn remaining(&self) -> Option<f32> {
        self.duration.map(|d| (d - self.elapsed).max(0.0))
    }
}

/// Effect payload of a buff: the closed set of things a buff can do.
#[derive(Clone, Debug)]
pub enum BuffEffect {
    /// Periodic damage, applied on each tick.
    Burn {
        damage_per_tick: f32,
        /// Credited with the damage, if still around.
        source: Option<Entity>,
    },
    /// Multiplicative movement-speed reduction. `factor` is the reduction
    /// fraction (0.3 = 30% slower); simultaneous slows compose
    /// multiplicatively through the target's slow list.
    Slow { factor: f32 },
    /// Blocks movement while active. Stacks as a counter so overlapping
    /// stuns from different sources release correctly.
    Stun,
    /// Contributes shared display state: a tint blend and/or a floating
    /// overlay icon, both ref-counted per target.
    Vfx {
        tint: Option<TintSpec>,
        overlay: Option<OverlayKind>,
    },
}

impl BuffEffect {
    /// Invoked once when the buff is first applied (not on merge).
    pub fn on_apply(
        &self,
        buff: &Buff,
        target: Entity,
        stats: &mut BaseStats,
        host: &mut EffectHost,
    ) -> Result<(), EffectError> {
        match self {
            BuffEffect::Burn { .. } => Ok(()),
            BuffEffect::Slow { factor } => {
                host.upsert_slow(target, &buff.id, *factor)?;
                host.recompute_move_speed(target, stats)
            }
            BuffEffect::Stun => host.add_stun(target),
            BuffEffect::Vfx { tint, overlay } => {
                if let Some(spec) = tint {
                    host.add_tint(target, &buff.id, *spec)?;
                }
                if let Some(kind) = overlay {
                    host.acquire_overlay(target, *kind)?;
                }
                Ok(())
            }
        }
    }

    /// Invoked every time `elapsed_tick` crosses the tick interval.
    pub fn on_tick(
        &self,
        _buff: &Buff,
        target: Entity,
        _stats: &mut BaseStats,
        host: &mut EffectHost,
    ) -> Result<(), EffectError> {
        match self {
            BuffEffect::Burn {
                damage_per_tick,
                source,
            } => {
                host.deal_damage(target, *damage_per_tick, *source, "Burn")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Invoked after the buff has been taken out of the manager's list, on
    /// expiry or explicit removal.
    pub fn on_remove(
        &self,
        buff: &Buff,
        target: Entity,
        stats: &mut BaseStats,
        host: &mut EffectHost,
    ) -> Result<(), EffectError> {
        match self {
            BuffEffect::Burn { .. } => Ok(()),
            BuffEffect::Slow { .. } => {
                host.remove_slow(target, &buff.id);
                host.recompute_move_speed(target, stats)
            }
            BuffEffect::Stun => {
                host.release_stun(target);
                Ok(())
            }
            BuffEffect::Vfx { tint, overlay } => {
                if tint.is_some() {
                    host.release_tint(target, &buff.id);
                }
                if let Some(kind) = overlay {
                    host.release_overlay(target, *kind);
                }
                Ok(())
            }
        }
    }
}
