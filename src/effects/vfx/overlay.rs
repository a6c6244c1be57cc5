//! Floating overlay icons.
//!
//! At most one overlay node exists per (target, kind) pair; every buff that
//! wants the icon holds a reference on the shared handle instead of spawning
//! its own node. The node follows its target with a small sinusoidal wobble
//! and is destroyed exactly when the last reference releases, or
//! immediately when the target dies, which overrides the ref-count.

use bevy::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::combat::SimClock;
use crate::effects::host::Health;

/// Vertical distance of an overlay above its target's origin.
const OVERLAY_HEIGHT: f32 = 2.4;
/// Wobble oscillations per second.
const WOBBLE_FREQUENCY: f32 = 1.2;
/// Wobble amplitude in world units.
const WOBBLE_AMPLITUDE: f32 = 0.18;

/// The kinds of floating icons buffs can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Burning marker.
    Flame,
    /// Chilled/slowed marker.
    Frost,
    /// Stunned marker.
    Stars,
}

impl OverlayKind {
    /// Anchor offset from the target's origin. Kinds sit at slightly
    /// different heights so concurrent icons don't overlap.
    pub fn offset(&self) -> Vec3 {
        match self {
            OverlayKind::Flame => Vec3::new(0.0, OVERLAY_HEIGHT, 0.0),
            OverlayKind::Frost => Vec3::new(-0.5, OVERLAY_HEIGHT + 0.2, 0.0),
            OverlayKind::Stars => Vec3::new(0.5, OVERLAY_HEIGHT + 0.4, 0.0),
        }
    }
}

/// Marker component on a spawned overlay node entity.
#[derive(Component, Clone, Copy, Debug)]
pub struct OverlayNode {
    pub target: Entity,
    pub kind: OverlayKind,
}

pub struct OverlayHandle {
    /// Independent buffs currently referencing this overlay.
    pub refs: u32,
    /// The spawned node entity.
    pub node: Entity,
    /// Random wobble phase rolled once at creation.
    pub phase: f32,
}

/// Owner of every overlay handle. Nodes are only created and destroyed
/// through the arena, never by individual buffs.
#[derive(Resource, Default)]
pub struct OverlayArena {
    handles: HashMap<(Entity, OverlayKind), OverlayHandle>,
}

impl OverlayArena {
    /// Add a reference to an existing handle. Returns false when no handle
    /// exists yet (the caller then spawns a node and calls [`insert`]).
    ///
    /// [`insert`]: OverlayArena::insert
    pub fn bump(&mut self, target: Entity, kind: OverlayKind) -> bool {
        match self.handles.get_mut(&(target, kind)) {
            Some(handle) => {
                handle.refs += 1;
                true
            }
            None => false,
        }
    }

    pub fn insert(&mut self, target: Entity, kind: OverlayKind, node: Entity, phase: f32) {
        self.handles
            .insert((target, kind), OverlayHandle { refs: 1, node, phase });
    }

    /// Drop one reference. Returns the node entity to despawn when the last
    /// reference released, `None` otherwise.
    pub fn release(&mut self, target: Entity, kind: OverlayKind) -> Option<Entity> {
        let handle = self.handles.get_mut(&(target, kind))?;
        handle.refs = handle.refs.saturating_sub(1);
        if handle.refs == 0 {
            let node = handle.node;
            self.handles.remove(&(target, kind));
            Some(node)
        } else {
            None
        }
    }

    pub fn refs(&self, target: Entity, kind: OverlayKind) -> u32 {
        self.handles.get(&(target, kind)).map_or(0, |h| h.refs)
    }

    pub fn node(&self, target: Entity, kind: OverlayKind) -> Option<Entity> {
        self.handles.get(&(target, kind)).map(|h| h.node)
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Drop every handle bound to `target` regardless of outstanding
    /// references, returning the nodes to despawn. Used on the target's
    /// death path.
    pub fn force_release_target(&mut self, target: Entity) -> SmallVec<[Entity; 2]> {
        let mut nodes = SmallVec::new();
        self.handles.retain(|(owner, _), handle| {
            if *owner == target {
                nodes.push(handle.node);
                false
            } else {
                true
            }
        });
        nodes
    }

    fn retain(
        &mut self,
        keep: impl FnMut(&(Entity, OverlayKind), &mut OverlayHandle) -> bool,
    ) {
        self.handles.retain(keep);
    }
}

/// Re-anchor every overlay node to its target once per frame, and release
/// handles whose target died or despawned; a node must never outlive its
/// target.
pub fn update_overlay_nodes(
    clock: Res<SimClock>,
    mut arena: ResMut<OverlayArena>,
    mut commands: Commands,
    targets: Query<(&Transform, &Health), Without<OverlayNode>>,
    mut nodes: Query<&mut Transform, With<OverlayNode>>,
) {
    let now = clock.elapsed;
    arena.retain(|(target, kind), handle| match targets.get(*target) {
        Ok((anchor, health)) if health.is_alive() => {
            if let Ok(mut transform) = nodes.get_mut(handle.node) {
                let wobble = (now * WOBBLE_FREQUENCY * std::f32::consts::TAU + handle.phase).sin()
                    * WOBBLE_AMPLITUDE;
                transform.translation = anchor.translation + kind.offset() + Vec3::Y * wobble;
            }
            true
        }
        _ => {
            if let Some(mut node) = commands.get_entity(handle.node) {
                node.despawn();
            }
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_requires_existing_handle() {
        let mut arena = OverlayArena::default();
        let target = Entity::from_raw(1);
        assert!(!arena.bump(target, OverlayKind::Flame));
        arena.insert(target, OverlayKind::Flame, Entity::from_raw(2), 0.0);
        assert!(arena.bump(target, OverlayKind::Flame));
        assert_eq!(arena.refs(target, OverlayKind::Flame), 2);
    }

    #[test]
    fn test_release_returns_node_only_at_zero() {
        let mut arena = OverlayArena::default();
        let target = Entity::from_raw(1);
        let node = Entity::from_raw(2);
        arena.insert(target, OverlayKind::Frost, node, 0.0);
        arena.bump(target, OverlayKind::Frost);

        assert_eq!(arena.release(target, OverlayKind::Frost), None);
        assert_eq!(arena.release(target, OverlayKind::Frost), Some(node));
        // Further releases are no-ops.
        assert_eq!(arena.release(target, OverlayKind::Frost), None);
    }

    #[test]
    fn test_force_release_ignores_ref_count() {
        let mut arena = OverlayArena::default();
        let target = Entity::from_raw(1);
        arena.insert(target, OverlayKind::Flame, Entity::from_raw(2), 0.0);
        arena.bump(target, OverlayKind::Flame);
        arena.insert(target, OverlayKind::Stars, Entity::from_raw(3), 0.0);
        arena.insert(Entity::from_raw(9), OverlayKind::Flame, Entity::from_raw(4), 0.0);

        let nodes = arena.force_release_target(target);
        assert_eq!(nodes.len(), 2);
        assert_eq!(arena.handle_count(), 1);
        assert_eq!(arena.refs(target, OverlayKind::Flame), 0);
    }

    #[test]
    fn test_kinds_anchor_at_distinct_offsets() {
        assert_ne!(OverlayKind::Flame.offset(), OverlayKind::Frost.offset());
        assert_ne!(OverlayKind::Frost.offset(), OverlayKind::Stars.offset());
    }
}
