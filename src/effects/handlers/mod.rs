//! Concrete effect handlers, one module per effect kind.
//!
//! Burn and slow install persistent buffs; knockback, ricochet, and pierce
//! are one-shot mutations of target or projectile state. All of them are
//! registered into the [`EffectRegistry`](super::registry::EffectRegistry)
//! at startup.

pub mod burn;
pub mod knockback;
pub mod pierce;
pub mod ricochet;
pub mod slow;
