//! Shared, ref-counted display state driven by buffs.
//!
//! Two visual kinds exist: a continuous tint blended onto the target's body
//! color, and a floating overlay icon that tracks the target. Both are
//! shared between every buff that contributes to them and recomputed from
//! scratch each frame, never blended incrementally, so the displayed result
//! cannot drift with add/remove order.

pub mod overlay;
pub mod tint;

pub use overlay::{OverlayArena, OverlayKind, OverlayNode};
pub use tint::{Pulse, TintCompositor, TintSpec};
