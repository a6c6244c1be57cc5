//! Per-target buff bookkeeping.
//!
//! Each effect-receiving entity carries a `BuffManager` component owning its
//! active buffs and a snapshot of pre-modifier base stats. The exclusive
//! [`drive_buff_managers`] system advances every manager once per frame.
//!
//! Re-applying a buff id merges into the existing instance (timers reset,
//! duration selectively refreshed) instead of stacking a duplicate. Buffs are
//! visited in reverse insertion order during update so expiry removal is safe
//! mid-iteration.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::combat::events::{BuffAppliedEvent, BuffRemovalReason, BuffRemovedEvent};
use crate::combat::SimClock;

use super::buff::Buff;
use super::host::EffectHost;

/// Stats whose pre-modifier values managers snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatKey {
    MoveSpeed,
}

/// Pre-modifier stat values, captured lazily the first time a modifier needs
/// a baseline. Stat-modifying buffs always recompute from here so repeated
/// re-applications cannot compound multiplicative error.
#[derive(Default, Debug, Clone)]
pub struct BaseStats {
    values: HashMap<StatKey, f32>,
}

impl BaseStats {
    /// Return the baseline for `key`, capturing `current` as that baseline
    /// the first time the key is seen.
    pub fn snapshot(&mut self, key: StatKey, current: f32) -> f32 {
        *self.values.entry(key).or_insert(current)
    }

    pub fn get(&self, key: StatKey) -> Option<f32> {
        self.values.get(&key).copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Predicate checked at the top of every update; while it returns true the
/// manager's time does not advance and no hooks fire.
pub type PauseCheck = fn(&World) -> bool;

/// Ordered collection of active buffs on one entity.
#[derive(Component)]
pub struct BuffManager {
    buffs: Vec<Buff>,
    pub base_stats: BaseStats,
    pause_check: Option<PauseCheck>,
    initialized: bool,
}

/// The default value is an *uninitialized placeholder*: it is what
/// `std::mem::take` leaves behind while a manager is temporarily out of the
/// world, and the frame driver skips it. Use [`BuffManager::new`] for a live
/// manager.
impl Default for BuffManager {
    fn default() -> Self {
        Self {
            buffs: Vec::new(),
            base_stats: BaseStats::default(),
            pause_check: None,
            initialized: false,
        }
    }
}

impl BuffManager {
    pub fn new() -> Self {
        Self {
            initialized: true,
            ..Self::default()
        }
    }

    pub fn with_pause_check(check: PauseCheck) -> Self {
        Self {
            pause_check: Some(check),
            ..Self::new()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn buffs(&self) -> &[Buff] {
        &self.buffs
    }

    pub fn get(&self, id: &str) -> Option<&Buff> {
        self.buffs.iter().find(|b| b.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }

    /// Apply a buff, merging when the id already exists.
    ///
    /// Merge overwrites every field from the incoming buff except `duration`,
    /// which is only replaced by a finite incoming value; timers reset to
    /// zero either way and the `on_apply` hook does not re-fire. A new buff
    /// with an empty id is rejected, and a non-finite duration is coerced to
    /// indefinite with a warning (both indicate caller bugs, handled without
    /// unwinding). Returns the applied instance, or `None` when rejected.
    pub fn apply(&mut self, incoming: Buff, target: Entity, host: &mut EffectHost) -> Option<&Buff> {
        if !self.initialized {
            // Either destroyed, or the placeholder of a manager that is
            // currently mid-operation; anything stored here would be lost.
            warn!(
                "dropping buff '{}': no live manager on {:?}",
                incoming.id, target
            );
            return None;
        }
        if incoming.id.is_empty() {
            warn!("rejecting buff with empty id on {:?}", target);
            return None;
        }

        if let Some(index) = self.buffs.iter().position(|b| b.id == incoming.id) {
            let duration = match incoming.duration {
                Some(d) if d.is_finite() => Some(d),
                Some(d) => {
                    warn!(
                        "ignoring non-finite duration {} while refreshing '{}'",
                        d, incoming.id
                    );
                    self.buffs[index].duration
                }
                None => self.buffs[index].duration,
            };
            let merged = Buff {
                duration,
                elapsed: 0.0,
                elapsed_tick: 0.0,
                ..incoming
            };
            host.send(BuffAppliedEvent {
                target,
                buff_id: merged.id.clone(),
                kind: merged.kind,
                duration: merged.duration,
                refreshed: true,
            });
            self.buffs[index] = merged;
            return self.buffs.get(index);
        }

        let duration = match incoming.duration {
            Some(d) if d.is_finite() => Some(d),
            Some(d) => {
                warn!(
                    "non-finite duration {} on new buff '{}'; treating as indefinite",
                    d, incoming.id
                );
                None
            }
            None => None,
        };
        let buff = Buff {
            duration,
            elapsed: 0.0,
            elapsed_tick: 0.0,
            ..incoming
        };
        host.send(BuffAppliedEvent {
            target,
            buff_id: buff.id.clone(),
            kind: buff.kind,
            duration: buff.duration,
            refreshed: false,
        });
        self.buffs.push(buff);
        let index = self.buffs.len() - 1;
        let snapshot = self.buffs[index].clone();
        if let Err(error) = snapshot
            .effect
            .on_apply(&snapshot, target, &mut self.base_stats, host)
        {
            host.report_fault(target, "apply", &error);
        }
        self.buffs.get(index)
    }

    /// Remove the buff with `id`, if present. The buff is taken out of the
    /// list *before* `on_remove` fires, so observers never see it still
    /// active. No-op when absent.
    pub fn remove(&mut self, id: &str, target: Entity, host: &mut EffectHost) {
        let Some(index) = self.buffs.iter().position(|b| b.id == id) else {
            return;
        };
        let buff = self.buffs.remove(index);
        host.send(BuffRemovedEvent {
            target,
            buff_id: buff.id.clone(),
            kind: buff.kind,
            reason: BuffRemovalReason::Dismissed,
        });
        if let Err(error) = buff
            .effect
            .on_remove(&buff, target, &mut self.base_stats, host)
        {
            host.report_fault(target, "remove", &error);
        }
    }

    /// Advance all buffs by `dt` seconds.
    ///
    /// A non-finite `dt` or an active pause check makes this a full no-op.
    /// Buffs are visited newest-first; a periodic buff fires at most one tick
    /// per update and keeps the remainder past the interval (subtraction, not
    /// reset, so cadence never drifts). Expired buffs leave the list before
    /// their `on_remove` fires. Every hook failure is contained to its buff.
    pub fn update(&mut self, dt: f32, target: Entity, host: &mut EffectHost) {
        if !self.initialized {
            return;
        }
        if !dt.is_finite() {
            warn!("ignoring buff update with non-finite dt {}", dt);
            return;
        }
        if self.pause_check.is_some_and(|paused| paused(host.world())) {
            return;
        }

        let mut index = self.buffs.len();
        while index > 0 {
            index -= 1;

            let mut fire_tick = false;
            {
                let buff = &mut self.buffs[index];
                buff.elapsed += dt;
                if let Some(interval) = buff.tick_interval {
                    if interval.is_finite() && interval > 0.0 {
                        buff.elapsed_tick += dt;
                        if buff.elapsed_tick >= interval {
                            buff.elapsed_tick -= interval;
                            fire_tick = true;
                        }
                    }
                }
            }

            if fire_tick {
                let snapshot = self.buffs[index].clone();
                if let Err(error) = snapshot
                    .effect
                    .on_tick(&snapshot, target, &mut self.base_stats, host)
                {
                    host.report_fault(target, "tick", &error);
                }
            }

            let expired = {
                let buff = &self.buffs[index];
                buff.duration.is_some_and(|d| buff.elapsed >= d)
            };
            if expired {
                let buff = self.buffs.remove(index);
                host.send(BuffRemovedEvent {
                    target,
                    buff_id: buff.id.clone(),
                    kind: buff.kind,
                    reason: BuffRemovalReason::Expired,
                });
                if let Err(error) = buff
                    .effect
                    .on_remove(&buff, target, &mut self.base_stats, host)
                {
                    host.report_fault(target, "remove", &error);
                }
            }
        }
    }

    /// Clear all buffs and the base-stat snapshot and mark the manager
    /// uninitialized. The frame driver skips uninitialized managers, so a
    /// destroyed manager cannot tick even if its component lingers for the
    /// rest of the frame.
    pub fn destroy(&mut self) {
        self.buffs.clear();
        self.base_stats.clear();
        self.initialized = false;
    }
}

/// Advance one entity's manager by `dt`.
///
/// The manager is moved out of the world for the duration of the update
/// (leaving the skipped placeholder behind) so hooks get full world access,
/// then reinstalled if the entity survived its own hooks.
pub fn tick_buff_manager(world: &mut World, entity: Entity, dt: f32) {
    let Some(mut slot) = world.get_mut::<BuffManager>(entity) else {
        return;
    };
    if !slot.is_initialized() {
        return;
    }
    let mut manager = std::mem::take(&mut *slot);
    manager.update(dt, entity, &mut EffectHost::new(world));
    if world.entities().contains(entity) {
        world.entity_mut(entity).insert(manager);
    }
}

/// Frame driver: advance every initialized manager once, in an arbitrary
/// order across entities. Iterates a snapshot of the current managers so
/// hooks that spawn or destroy entities cannot invalidate the pass.
pub fn drive_buff_managers(world: &mut World) {
    let dt = world.resource::<SimClock>().dt;
    let mut managers = world.query_filtered::<Entity, With<BuffManager>>();
    let entities: Vec<Entity> = managers.iter(world).collect();
    for entity in entities {
        tick_buff_manager(world, entity, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_stats_snapshot_captures_first_value() {
        let mut stats = BaseStats::default();
        assert_eq!(stats.snapshot(StatKey::MoveSpeed, 5.0), 5.0);
        // Later calls ignore the (possibly already modified) current value.
        assert_eq!(stats.snapshot(StatKey::MoveSpeed, 3.5), 5.0);
    }

    #[test]
    fn test_base_stats_clear_forgets_baseline() {
        let mut stats = BaseStats::default();
        stats.snapshot(StatKey::MoveSpeed, 5.0);
        stats.clear();
        assert_eq!(stats.get(StatKey::MoveSpeed), None);
    }

    #[test]
    fn test_default_manager_is_uninitialized_placeholder() {
        assert!(!BuffManager::default().is_initialized());
        assert!(BuffManager::new().is_initialized());
    }
}
