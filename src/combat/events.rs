//! Combat events
//!
//! Defines the events that occur during a simulation for logging and processing.

use bevy::prelude::*;

/// Event fired when damage is dealt to a target
#[derive(Event)]
pub struct DamageEvent {
    /// Entity dealing the damage (None if the source is gone)
    pub source: Option<Entity>,
    /// Entity receiving the damage
    pub target: Entity,
    /// Amount of damage actually applied (after clamping to remaining health)
    pub amount: f32,
    /// Name of the effect that caused the damage (e.g. "Burn", "Impact")
    pub label: String,
}

/// Event fired when a buff is applied to a target
#[derive(Event)]
pub struct BuffAppliedEvent {
    /// Entity the buff is applied to
    pub target: Entity,
    /// Unique buff id within the target's manager
    pub buff_id: String,
    /// Semantic tag ("burn", "slow", "knockback_stun", ...)
    pub kind: &'static str,
    /// Duration in seconds (None = until manually removed)
    pub duration: Option<f32>,
    /// Whether this application merged into an existing buff
    pub refreshed: bool,
}

/// Event fired when a buff is removed
#[derive(Event)]
pub struct BuffRemovedEvent {
    /// Entity the buff was on
    pub target: Entity,
    /// Unique buff id within the target's manager
    pub buff_id: String,
    /// Semantic tag
    pub kind: &'static str,
    /// Why it was removed
    pub reason: BuffRemovalReason,
}

/// Reason a buff was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffRemovalReason {
    /// Duration expired
    Expired,
    /// Removed explicitly by gameplay code
    Dismissed,
}

/// Event fired when a projectile strikes a target
#[derive(Event)]
pub struct ProjectileHitEvent {
    /// The projectile entity
    pub projectile: Entity,
    /// Stable identity of whoever fired it
    pub source_id: String,
    /// Entity that was struck
    pub target: Entity,
    /// Impact damage applied on the hit itself (effects damage is separate)
    pub damage: f32,
}

/// Event fired when a target dies
#[derive(Event)]
pub struct TargetDeathEvent {
    /// Entity that died
    pub target: Entity,
    /// Entity credited with the kill, if known
    pub killer: Option<Entity>,
}

/// Event fired when a buff hook or effect handler reports a failure.
///
/// Faults are contained at the call site; this event exists so the log
/// records them for post-run analysis.
#[derive(Event)]
pub struct EffectFaultEvent {
    /// Entity the failing effect was operating on
    pub target: Entity,
    /// Which stage failed ("apply", "tick", "remove", "install", ...)
    pub stage: &'static str,
    /// Human-readable failure description
    pub detail: String,
}
