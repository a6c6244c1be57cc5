//! The status-effect engine: timed buffs per target, the projectile-effect
//! application pipeline, and the shared visual state they drive.
//!
//! ## Frame phases
//!
//! Effect systems run in three ordered phases each frame:
//!
//! 1. **Drive** - advance every buff manager (ticks, expiry) and run due
//!    delayed actions
//! 2. **Resolve** - projectile hits apply their effect loadouts; deferred
//!    installs from earlier frames resolve (with liveness re-checks)
//! 3. **Visuals** - recompute tint blends and re-anchor overlay nodes from
//!    the frame's final buff state
//!
//! The host simulation (graphical arena or headless runner) schedules its
//! own systems around these sets.

pub mod buff;
pub mod handlers;
pub mod host;
pub mod manager;
pub mod pipeline;
pub mod registry;
pub mod vfx;

pub use buff::{Buff, BuffEffect, EffectError};
pub use host::{ActiveSlows, BodyColor, EffectHost, Health, MoveSpeed, Stunned, Velocity};
pub use manager::{BuffManager, StatKey};
pub use pipeline::{apply_effects, PendingInstalls, Projectile};
pub use registry::{EffectContext, EffectHandler, EffectKind, EffectRegistry, EffectSpec, InstallOutcome};

use bevy::prelude::*;

use host::{run_delayed_actions, DelayedActions};
use manager::drive_buff_managers;
use pipeline::resolve_pending_installs;
use vfx::overlay::{update_overlay_nodes, OverlayArena};
use vfx::tint::{composite_tints, sweep_dead_tints, TintCompositor};

/// System set labels for the effect engine's frame phases.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// Buff manager updates and delayed actions
    Drive,
    /// Effect application and deferred-install resolution
    Resolve,
    /// Tint compositing and overlay anchoring
    Visuals,
}

/// Plugin registering the effect engine's resources and systems.
///
/// Requires [`CombatPlugin`](crate::combat::CombatPlugin) for the simulation
/// clock and events.
pub struct EffectEnginePlugin;

impl Plugin for EffectEnginePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EffectRegistry>()
            .init_resource::<TintCompositor>()
            .init_resource::<OverlayArena>()
            .init_resource::<PendingInstalls>()
            .init_resource::<DelayedActions>();

        app.configure_sets(
            Update,
            (EffectPhase::Drive, EffectPhase::Resolve, EffectPhase::Visuals).chain(),
        );

        app.add_systems(
            Update,
            (drive_buff_managers, run_delayed_actions)
                .chain()
                .in_set(EffectPhase::Drive),
        )
        .add_systems(Update, resolve_pending_installs.in_set(EffectPhase::Resolve))
        .add_systems(
            Update,
            (sweep_dead_tints, composite_tints, update_overlay_nodes)
                .chain()
                .in_set(EffectPhase::Visuals),
        );
    }
}
