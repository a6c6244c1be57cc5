//! World adapter for buff hooks and effect handlers.
//!
//! `EffectHost` is the only surface through which effects touch the rest of
//! the simulation: numeric entity fields (health, speed, velocity), liveness
//! checks, buff application on other targets, shared visual state, delayed
//! one-shot actions, and event emission. Hooks receive a host instead of the
//! raw `World` so every mutation they can perform is enumerated here.

use bevy::prelude::*;

use crate::combat::events::{DamageEvent, EffectFaultEvent};
use crate::combat::{GameRng, SimClock};

use super::buff::{Buff, EffectError};
use super::manager::{BaseStats, BuffManager, PauseCheck, StatKey};
use super::vfx::overlay::{OverlayArena, OverlayKind, OverlayNode};
use super::vfx::tint::{TintCompositor, TintSpec};

/// Maximum reduction fraction a single slow may contribute.
pub const MAX_SLOW_FACTOR: f32 = 0.99;

// ============================================================================
// Entity field components
// ============================================================================

/// Hit points of an effect-receiving entity.
#[derive(Component, Clone, Debug)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Current health as a fraction of max, clamped to [0, 1].
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

/// Current movement speed in units per second. The pre-modifier value is
/// snapshotted into the owner's [`BaseStats`] the first time a modifier
/// touches it, so repeated re-applications never compound.
#[derive(Component, Clone, Debug)]
pub struct MoveSpeed {
    pub current: f32,
}

impl MoveSpeed {
    pub fn new(speed: f32) -> Self {
        Self { current: speed }
    }
}

/// Velocity in world units per second, integrated by the movement systems.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity(pub Vec3);

/// Displayed color of a target's body, written by the tint compositor every
/// frame and synced to the render material by the graphical layer.
#[derive(Component, Clone, Debug)]
pub struct BodyColor {
    pub color: Color,
}

/// Shared list of movement-speed reductions on one target. Each active slow
/// buff contributes one entry keyed by its buff id; the combined multiplier
/// is the product of every entry's `1 - factor`.
#[derive(Component, Default, Debug)]
pub struct ActiveSlows {
    entries: Vec<SlowEntry>,
}

#[derive(Debug, Clone)]
pub struct SlowEntry {
    pub buff_id: String,
    pub factor: f32,
}

impl ActiveSlows {
    /// Insert or refresh the entry for `buff_id`. The factor is clamped so a
    /// single slow can never fully stop a target.
    pub fn upsert(&mut self, buff_id: &str, factor: f32) {
        let factor = factor.clamp(0.0, MAX_SLOW_FACTOR);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.buff_id == buff_id) {
            entry.factor = factor;
        } else {
            self.entries.push(SlowEntry {
                buff_id: buff_id.to_string(),
                factor,
            });
        }
    }

    pub fn remove(&mut self, buff_id: &str) {
        self.entries.retain(|e| e.buff_id != buff_id);
    }

    /// Combined movement multiplier from all active slows.
    pub fn multiplier(&self) -> f32 {
        self.entries.iter().map(|e| 1.0 - e.factor).product()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counted stun marker. Overlapping stuns from independent sources each add
/// one; the component is removed when the last one releases.
#[derive(Component, Debug)]
pub struct Stunned {
    pub count: u32,
}

// ============================================================================
// Delayed one-shot actions
// ============================================================================

type DelayedFn = Box<dyn FnOnce(&mut World) + Send + Sync>;

struct DelayedAction {
    remaining: f32,
    action: DelayedFn,
}

/// Single-shot future callbacks ("do X after N seconds"), serviced once per
/// frame. Actions run on the simulation thread with full world access and
/// must re-check any entity they captured.
#[derive(Resource, Default)]
pub struct DelayedActions {
    queue: Vec<DelayedAction>,
}

impl DelayedActions {
    pub fn schedule(&mut self, delay: f32, action: impl FnOnce(&mut World) + Send + Sync + 'static) {
        self.queue.push(DelayedAction {
            remaining: delay,
            action: Box::new(action),
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Tick down scheduled actions and run the ones that are due.
pub fn run_delayed_actions(world: &mut World) {
    let dt = world.resource::<SimClock>().dt;
    let due: Vec<DelayedFn> = {
        let mut actions = world.resource_mut::<DelayedActions>();
        let mut due = Vec::new();
        let mut i = 0;
        while i < actions.queue.len() {
            actions.queue[i].remaining -= dt;
            if actions.queue[i].remaining <= 0.0 {
                due.push(actions.queue.remove(i).action);
            } else {
                i += 1;
            }
        }
        due
    };
    for action in due {
        action(world);
    }
}

// ============================================================================
// EffectHost
// ============================================================================

/// Borrowed view of the world handed to buff hooks and effect handlers.
pub struct EffectHost<'w> {
    world: &'w mut World,
}

impl<'w> EffectHost<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { world }
    }

    /// Read-only world access (pause checks, tests).
    pub fn world(&self) -> &World {
        self.world
    }

    /// Whether the entity still exists and has health remaining.
    pub fn is_live(&self, entity: Entity) -> bool {
        self.world
            .get::<Health>(entity)
            .is_some_and(|h| h.is_alive())
    }

    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.world.get::<Transform>(entity).map(|t| t.translation)
    }

    /// Apply damage, clamped to remaining health. Returns the amount
    /// actually applied. Damage against an already-dead target is a no-op.
    pub fn deal_damage(
        &mut self,
        target: Entity,
        amount: f32,
        source: Option<Entity>,
        label: &str,
    ) -> Result<f32, EffectError> {
        let Some(mut health) = self.world.get_mut::<Health>(target) else {
            return Err(EffectError::TargetGone(target));
        };
        if !health.is_alive() {
            return Ok(0.0);
        }
        let actual = amount.clamp(0.0, health.current);
        health.current -= actual;
        self.world.send_event(DamageEvent {
            source,
            target,
            amount: actual,
            label: label.to_string(),
        });
        Ok(actual)
    }

    /// Add an instantaneous velocity impulse.
    pub fn apply_impulse(&mut self, target: Entity, impulse: Vec3) -> Result<(), EffectError> {
        let Some(mut velocity) = self.world.get_mut::<Velocity>(target) else {
            return Err(EffectError::MissingState {
                entity: target,
                component: "Velocity",
            });
        };
        velocity.0 += impulse;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Buff manager access
    // ------------------------------------------------------------------

    /// Ensure `target` carries a buff manager. Idempotent: an existing
    /// manager (and its pause check) is left untouched.
    pub fn attach_manager(&mut self, target: Entity, pause_check: Option<PauseCheck>) {
        if !self.world.entities().contains(target) {
            return;
        }
        if self.world.get::<BuffManager>(target).is_none() {
            let manager = match pause_check {
                Some(check) => BuffManager::with_pause_check(check),
                None => BuffManager::new(),
            };
            self.world.entity_mut(target).insert(manager);
        }
    }

    /// Apply (or merge) a buff on `target`, lazily attaching a manager.
    ///
    /// The manager is taken out of the world for the duration of the call so
    /// hooks observe a consistent snapshot; the uninitialized placeholder
    /// left behind is skipped by the frame driver.
    pub fn apply_buff(&mut self, target: Entity, buff: Buff) -> Result<(), EffectError> {
        if !self.world.entities().contains(target) {
            return Err(EffectError::TargetGone(target));
        }
        self.attach_manager(target, None);
        let mut manager = match self.world.get_mut::<BuffManager>(target) {
            Some(mut slot) => std::mem::take(&mut *slot),
            None => return Err(EffectError::TargetGone(target)),
        };
        manager.apply(buff, target, self);
        if self.world.entities().contains(target) {
            self.world.entity_mut(target).insert(manager);
        }
        Ok(())
    }

    /// Remove the buff with `id` from `target`, if present. No-op when the
    /// target has no manager or no such buff.
    pub fn remove_buff(&mut self, target: Entity, id: &str) {
        let Some(mut slot) = self.world.get_mut::<BuffManager>(target) else {
            return;
        };
        let mut manager = std::mem::take(&mut *slot);
        manager.remove(id, target, self);
        if self.world.entities().contains(target) {
            self.world.entity_mut(target).insert(manager);
        }
    }

    // ------------------------------------------------------------------
    // Stat modifiers
    // ------------------------------------------------------------------

    /// Insert or refresh a slow entry on the target's shared slow list.
    pub fn upsert_slow(
        &mut self,
        target: Entity,
        buff_id: &str,
        factor: f32,
    ) -> Result<(), EffectError> {
        if let Some(mut slows) = self.world.get_mut::<ActiveSlows>(target) {
            slows.upsert(buff_id, factor);
            return Ok(());
        }
        if !self.world.entities().contains(target) {
            return Err(EffectError::TargetGone(target));
        }
        let mut slows = ActiveSlows::default();
        slows.upsert(buff_id, factor);
        self.world.entity_mut(target).insert(slows);
        Ok(())
    }

    pub fn remove_slow(&mut self, target: Entity, buff_id: &str) {
        if let Some(mut slows) = self.world.get_mut::<ActiveSlows>(target) {
            slows.remove(buff_id);
        }
    }

    /// Recompute the target's movement speed from its base-stat snapshot and
    /// the current slow list. Always from the snapshot, never incrementally,
    /// so repeated merges cannot drift the value.
    pub fn recompute_move_speed(
        &mut self,
        target: Entity,
        stats: &mut BaseStats,
    ) -> Result<(), EffectError> {
        let multiplier = self
            .world
            .get::<ActiveSlows>(target)
            .map_or(1.0, |s| s.multiplier());
        let Some(mut speed) = self.world.get_mut::<MoveSpeed>(target) else {
            return Err(EffectError::MissingState {
                entity: target,
                component: "MoveSpeed",
            });
        };
        let base = stats.snapshot(StatKey::MoveSpeed, speed.current);
        speed.current = base * multiplier;
        Ok(())
    }

    /// Like [`recompute_move_speed`](Self::recompute_move_speed), but
    /// borrowing the base-stat snapshot from the target's own manager. Used
    /// when a slow is refreshed outside a hook (merge does not re-fire
    /// `on_apply`).
    pub fn recompute_move_speed_from_manager(&mut self, target: Entity) -> Result<(), EffectError> {
        let Some(mut manager) = self.world.get_mut::<BuffManager>(target) else {
            return Err(EffectError::MissingState {
                entity: target,
                component: "BuffManager",
            });
        };
        let mut stats = std::mem::take(&mut manager.base_stats);
        let result = self.recompute_move_speed(target, &mut stats);
        if let Some(mut manager) = self.world.get_mut::<BuffManager>(target) {
            manager.base_stats = stats;
        }
        result
    }

    pub fn add_stun(&mut self, target: Entity) -> Result<(), EffectError> {
        if let Some(mut stunned) = self.world.get_mut::<Stunned>(target) {
            stunned.count += 1;
            return Ok(());
        }
        if !self.world.entities().contains(target) {
            return Err(EffectError::TargetGone(target));
        }
        self.world.entity_mut(target).insert(Stunned { count: 1 });
        Ok(())
    }

    pub fn release_stun(&mut self, target: Entity) {
        let Some(mut stunned) = self.world.get_mut::<Stunned>(target) else {
            return;
        };
        stunned.count = stunned.count.saturating_sub(1);
        if stunned.count == 0 {
            self.world.entity_mut(target).remove::<Stunned>();
        }
    }

    // ------------------------------------------------------------------
    // Shared visuals
    // ------------------------------------------------------------------

    /// Register a tint contribution keyed by buff id. The contributor's
    /// pulse phase is rolled once here and stays fixed for its lifetime.
    pub fn add_tint(
        &mut self,
        target: Entity,
        buff_id: &str,
        spec: TintSpec,
    ) -> Result<(), EffectError> {
        if !self.world.entities().contains(target) {
            return Err(EffectError::TargetGone(target));
        }
        let phase = self.random_f32() * std::f32::consts::TAU;
        let mut compositor = self.world.resource_mut::<TintCompositor>();
        compositor.add(target, buff_id, spec, phase);
        Ok(())
    }

    pub fn release_tint(&mut self, target: Entity, buff_id: &str) {
        let mut compositor = self.world.resource_mut::<TintCompositor>();
        compositor.release(target, buff_id);
    }

    /// Acquire (or re-reference) the floating overlay node for
    /// `(target, kind)`. At most one node exists per pair; further acquires
    /// only bump its reference count.
    pub fn acquire_overlay(&mut self, target: Entity, kind: OverlayKind) -> Result<(), EffectError> {
        let Some(anchor) = self.position(target) else {
            return Err(EffectError::TargetGone(target));
        };
        let phase = self.random_f32() * std::f32::consts::TAU;
        self.world
            .resource_scope(|world, mut arena: Mut<OverlayArena>| {
                if !arena.bump(target, kind) {
                    let node = world
                        .spawn((
                            OverlayNode { target, kind },
                            Transform::from_translation(anchor + kind.offset()),
                        ))
                        .id();
                    arena.insert(target, kind, node, phase);
                }
            });
        Ok(())
    }

    /// Drop one reference to the `(target, kind)` overlay; the node is
    /// destroyed exactly when the last reference releases.
    pub fn release_overlay(&mut self, target: Entity, kind: OverlayKind) {
        let node = {
            let mut arena = self.world.resource_mut::<OverlayArena>();
            arena.release(target, kind)
        };
        if let Some(node) = node {
            self.world.despawn(node);
        }
    }

    // ------------------------------------------------------------------
    // Misc primitives
    // ------------------------------------------------------------------

    /// Schedule a single-shot action to run after `delay` seconds of sim
    /// time.
    pub fn schedule(&mut self, delay: f32, action: impl FnOnce(&mut World) + Send + Sync + 'static) {
        self.world
            .resource_mut::<DelayedActions>()
            .schedule(delay, action);
    }

    pub fn random_f32(&mut self) -> f32 {
        self.world
            .get_resource_or_insert_with(GameRng::default)
            .random_f32()
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.world
            .get_resource_or_insert_with(GameRng::default)
            .random_range(min, max)
    }

    pub fn send<E: Event>(&mut self, event: E) {
        self.world.send_event(event);
    }

    /// Record a contained hook/handler failure: developer log plus a fault
    /// event for the run log.
    pub fn report_fault(&mut self, target: Entity, stage: &'static str, error: &EffectError) {
        warn!("{} hook failed on {:?}: {}", stage, target, error);
        self.world.send_event(EffectFaultEvent {
            target,
            stage,
            detail: error.to_string(),
        });
    }
}
