//! Effect application pipeline.
//!
//! When a projectile strikes a target, every effect descriptor it carries is
//! resolved against the registry and applied: `install` first (persistent,
//! buff-backed), falling back to `apply` (one-shot) when install is
//! unsupported, declines, or fails. A failure in one effect never stops the
//! remaining effects on the same projectile.
//!
//! Installs may also defer: resolution then happens on a later frame through
//! [`PendingInstalls`], which re-checks target liveness before doing
//! anything. A target destroyed while an install was in flight cancels the
//! continuation instead of mutating a corpse.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::host::EffectHost;
use super::registry::{EffectContext, EffectKind, EffectRegistry, EffectSpec, InstallOutcome};

/// How many frames a deferred install may keep deferring before the
/// pipeline gives up and runs the one-shot fallback.
pub const INSTALL_RETRY_LIMIT: u8 = 3;

/// A projectile in flight, carrying its effect loadout and the shared flags
/// the handlers negotiate over.
#[derive(Component, Clone, Debug)]
pub struct Projectile {
    /// Entity that fired this projectile, if still around.
    pub source: Option<Entity>,
    /// Stable identity of the source, used for buff-id derivation.
    pub source_id: String,
    /// Rarity tier passed through to effect contexts.
    pub tier: u8,
    /// Current velocity in world units per second.
    pub velocity: Vec3,
    /// Damage applied by the hit itself, before any effects.
    pub impact_damage: f32,
    /// Effect descriptors in declaration order. Handlers run in this order,
    /// which matters: `should_destroy_after_hit` keeps the last writer's
    /// decision.
    pub effects: SmallVec<[EffectSpec; 4]>,
    /// Ricochets remaining.
    pub bounces_left: u32,
    /// Pass-throughs remaining.
    pub pierces_left: u32,
    /// Set when a ricochet redirected this projectile during the current
    /// frame's hit resolution; a co-located pierce defers while it is set.
    /// Cleared by the flight system at the start of the next frame.
    pub just_bounced: bool,
    /// Whether the projectile despawns once the current hit resolves.
    /// Defaults to true; ricochet and pierce overwrite it, last writer wins.
    pub should_destroy_after_hit: bool,
    /// Targets this projectile has already passed through, so a pierce
    /// never hits the same target twice. Cleared on ricochet since the
    /// trajectory changed.
    pub hit_memory: SmallVec<[Entity; 4]>,
}

impl Projectile {
    pub fn new(source_id: impl Into<String>, velocity: Vec3, impact_damage: f32) -> Self {
        Self {
            source: None,
            source_id: source_id.into(),
            tier: 1,
            velocity,
            impact_damage,
            effects: SmallVec::new(),
            bounces_left: 0,
            pierces_left: 0,
            just_bounced: false,
            should_destroy_after_hit: true,
            hit_memory: SmallVec::new(),
        }
    }

    pub fn from_source(mut self, source: Entity) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    /// Attach the effect loadout, seeding the bounce and pierce counters
    /// from the matching descriptors.
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = EffectSpec>) -> Self {
        self.effects = effects.into_iter().collect();
        for spec in &self.effects {
            match spec.kind {
                EffectKind::Ricochet => self.bounces_left = spec.bounces,
                EffectKind::Pierce => self.pierces_left = spec.pierces,
                _ => {}
            }
        }
        self
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn has_hit(&self, target: Entity) -> bool {
        self.hit_memory.contains(&target)
    }

    pub fn record_hit(&mut self, target: Entity) {
        if !self.has_hit(target) {
            self.hit_memory.push(target);
        }
    }

    pub fn forget_hits(&mut self) {
        self.hit_memory.clear();
    }
}

enum EffectDisposition {
    Done,
    Deferred,
}

/// Apply every effect the projectile carries to `target`.
///
/// Unknown effect kinds are logged and skipped. Each effect gets its own
/// context (source identity, tier, its descriptor); failures are contained
/// per effect. The mutated projectile state is written back afterwards if
/// the projectile entity still exists.
pub fn apply_effects(world: &mut World, projectile: Entity, target: Entity) {
    let Some(mut proj) = world.get::<Projectile>(projectile).cloned() else {
        return;
    };
    let specs = proj.effects.clone();
    let mut deferred: Vec<EffectContext> = Vec::new();

    world.resource_scope(|world, registry: Mut<EffectRegistry>| {
        for spec in specs.iter() {
            let Some(handler) = registry.handler_for(spec.kind) else {
                warn!("no handler registered for {:?}; skipping", spec.kind);
                continue;
            };
            let ctx = EffectContext {
                source: proj.source,
                source_id: proj.source_id.clone(),
                tier: proj.tier,
                projectile,
                spec: spec.clone(),
            };
            let mut host = EffectHost::new(world);
            match run_effect(handler, target, &ctx, &mut proj, &mut host) {
                EffectDisposition::Done => {}
                EffectDisposition::Deferred => deferred.push(ctx),
            }
        }
    });

    if !deferred.is_empty() {
        let mut pending = world.resource_mut::<PendingInstalls>();
        for ctx in deferred {
            pending.push(target, ctx);
        }
    }

    if world.entities().contains(projectile) {
        world.entity_mut(projectile).insert(proj);
    }
}

/// Install-then-fallback protocol for a single effect.
fn run_effect(
    handler: &dyn super::registry::EffectHandler,
    target: Entity,
    ctx: &EffectContext,
    proj: &mut Projectile,
    host: &mut EffectHost,
) -> EffectDisposition {
    match handler.install(target, ctx, host) {
        Some(Ok(InstallOutcome::Installed)) => return EffectDisposition::Done,
        Some(Ok(InstallOutcome::Deferred)) => return EffectDisposition::Deferred,
        Some(Ok(InstallOutcome::Declined)) => {}
        Some(Err(error)) => {
            // Fall through so the one-shot path still delivers the
            // immediate mechanical/visual feedback.
            host.report_fault(target, "install", &error);
        }
        None => {}
    }
    if let Some(Err(error)) = handler.apply(target, ctx, proj, host) {
        host.report_fault(target, "apply", &error);
    }
    EffectDisposition::Done
}

/// Effect installs whose resolution arrives on a later frame.
#[derive(Resource, Default)]
pub struct PendingInstalls {
    pending: Vec<PendingInstall>,
}

pub struct PendingInstall {
    pub target: Entity,
    pub ctx: EffectContext,
    pub retries_left: u8,
}

impl PendingInstalls {
    pub fn push(&mut self, target: Entity, ctx: EffectContext) {
        self.pending.push(PendingInstall {
            target,
            ctx,
            retries_left: INSTALL_RETRY_LIMIT,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Resolve deferred installs once per frame.
///
/// Every entry re-checks target liveness first: a dead or despawned target
/// cancels the continuation outright. A still-deferring install is retried a
/// bounded number of frames before the one-shot fallback runs instead.
pub fn resolve_pending_installs(world: &mut World) {
    if world.resource::<PendingInstalls>().is_empty() {
        return;
    }
    let batch = std::mem::take(&mut world.resource_mut::<PendingInstalls>().pending);
    let mut still_pending: Vec<PendingInstall> = Vec::new();

    world.resource_scope(|world, registry: Mut<EffectRegistry>| {
        for mut entry in batch {
            if !EffectHost::new(world).is_live(entry.target) {
                debug!(
                    "cancelling deferred {:?} install: target {:?} is gone",
                    entry.ctx.spec.kind, entry.target
                );
                continue;
            }
            let Some(handler) = registry.handler_for(entry.ctx.spec.kind) else {
                warn!(
                    "no handler registered for deferred {:?}; dropping",
                    entry.ctx.spec.kind
                );
                continue;
            };

            let outcome = {
                let mut host = EffectHost::new(world);
                handler.install(entry.target, &entry.ctx, &mut host)
            };
            match outcome {
                Some(Ok(InstallOutcome::Installed)) => {}
                Some(Ok(InstallOutcome::Deferred)) => {
                    if entry.retries_left > 1 {
                        entry.retries_left -= 1;
                        still_pending.push(entry);
                    } else {
                        fallback_apply(handler, &entry, world);
                    }
                }
                Some(Ok(InstallOutcome::Declined)) | None => {
                    fallback_apply(handler, &entry, world);
                }
                Some(Err(error)) => {
                    EffectHost::new(world).report_fault(entry.target, "install", &error);
                    fallback_apply(handler, &entry, world);
                }
            }
        }
    });

    world
        .resource_mut::<PendingInstalls>()
        .pending
        .extend(still_pending);
}

/// One-shot fallback for a deferred install that resolved negatively. The
/// owning projectile may be long gone by now; without it there is no
/// mechanical state left to mutate, so the fallback is skipped.
fn fallback_apply(
    handler: &dyn super::registry::EffectHandler,
    entry: &PendingInstall,
    world: &mut World,
) {
    let Some(mut proj) = world.get::<Projectile>(entry.ctx.projectile).cloned() else {
        debug!(
            "skipping apply fallback for {:?}: projectile gone",
            entry.ctx.spec.kind
        );
        return;
    };
    {
        let mut host = EffectHost::new(world);
        if let Some(Err(error)) = handler.apply(entry.target, &entry.ctx, &mut proj, &mut host) {
            host.report_fault(entry.target, "apply", &error);
        }
    }
    if world.entities().contains(entry.ctx.projectile) {
        world.entity_mut(entry.ctx.projectile).insert(proj);
    }
}
