//! Tint compositing.
//!
//! Every buff that tints its target registers a contributor keyed by its
//! buff id. Once per frame the compositor recomputes each tinted target's
//! displayed color from the full set of contributors over a health-derived
//! base tone. Removing the last contributor leaves the plain base tone.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::combat::SimClock;
use crate::effects::host::{BodyColor, Health};

/// Sinusoidal intensity modulation for a tint contributor, evaluated
/// against the shared simulation clock plus a per-contributor phase fixed
/// at creation.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    /// Oscillations per second.
    pub frequency: f32,
    /// Swing around the baseline.
    pub amplitude: f32,
    /// Center of the oscillation.
    pub baseline: f32,
}

/// One buff's tint contribution: a linear-space color and its blend weight,
/// optionally pulsing.
#[derive(Clone, Copy, Debug)]
pub struct TintSpec {
    /// Linear RGB, each channel in [0, 1].
    pub color: Vec3,
    /// Blend weight in [0, 1].
    pub alpha: f32,
    pub pulse: Option<Pulse>,
}

/// Body tone of a target at full health.
const HEALTHY_TONE: Vec3 = Vec3::new(0.35, 0.72, 0.42);
/// Body tone as health approaches zero.
const CRITICAL_TONE: Vec3 = Vec3::new(0.78, 0.28, 0.22);
/// Light neutral the health tone is softened toward.
const LIGHT_NEUTRAL: Vec3 = Vec3::new(0.84, 0.84, 0.80);
/// How far the health tone is pulled toward the neutral.
const NEUTRAL_BLEND: f32 = 0.55;

/// Base color for a target before any tint contributions.
pub fn health_base_tone(health_ratio: f32) -> Vec3 {
    let vivid = CRITICAL_TONE.lerp(HEALTHY_TONE, health_ratio.clamp(0.0, 1.0));
    vivid.lerp(LIGHT_NEUTRAL, NEUTRAL_BLEND)
}

pub struct TintContributor {
    pub buff_id: String,
    pub spec: TintSpec,
    /// Random phase rolled once when the contributor was created.
    pub phase: f32,
}

impl TintContributor {
    /// Instantaneous blend weight at simulation time `now`.
    pub fn intensity(&self, now: f32) -> f32 {
        let factor = match self.spec.pulse {
            None => 1.0,
            Some(pulse) => {
                pulse.baseline
                    + pulse.amplitude
                        * (now * pulse.frequency * std::f32::consts::TAU + self.phase).sin()
            }
        };
        (self.spec.alpha * factor).clamp(0.0, 1.0)
    }
}

/// All tint contributors, grouped per target.
#[derive(Resource, Default)]
pub struct TintCompositor {
    targets: HashMap<Entity, Vec<TintContributor>>,
}

impl TintCompositor {
    /// Register or refresh the contributor for `buff_id` on `target`. A
    /// refresh keeps the original phase so the pulse does not visibly jump.
    pub fn add(&mut self, target: Entity, buff_id: &str, spec: TintSpec, phase: f32) {
        let contributors = self.targets.entry(target).or_default();
        if let Some(existing) = contributors.iter_mut().find(|c| c.buff_id == buff_id) {
            existing.spec = spec;
        } else {
            contributors.push(TintContributor {
                buff_id: buff_id.to_string(),
                spec,
                phase,
            });
        }
    }

    /// Drop the contributor for `buff_id`. The target's entry disappears
    /// with its last contributor.
    pub fn release(&mut self, target: Entity, buff_id: &str) {
        if let Some(contributors) = self.targets.get_mut(&target) {
            contributors.retain(|c| c.buff_id != buff_id);
            if contributors.is_empty() {
                self.targets.remove(&target);
            }
        }
    }

    pub fn contributors(&self, target: Entity) -> Option<&[TintContributor]> {
        self.targets.get(&target).map(|v| v.as_slice())
    }

    pub fn contributor_count(&self, target: Entity) -> usize {
        self.targets.get(&target).map_or(0, |v| v.len())
    }

    /// Drop every contributor bound to `target`, regardless of how many
    /// buffs still reference them. Used on the target's death path.
    pub fn force_release_target(&mut self, target: Entity) {
        self.targets.remove(&target);
    }

    fn retain_targets(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.targets.retain(|target, _| keep(*target));
    }
}

/// Recompute every target's displayed color from scratch.
///
/// The blend: base tone weighted by `1 - total_alpha` (total clamped to 1)
/// plus the sum of each contributor's weighted color, channels clamped to
/// the valid range.
pub fn composite_tints(
    clock: Res<SimClock>,
    compositor: Res<TintCompositor>,
    mut targets: Query<(Entity, &Health, &mut BodyColor)>,
) {
    for (entity, health, mut body) in targets.iter_mut() {
        let base = health_base_tone(health.ratio());
        let blended = match compositor.contributors(entity) {
            Some(contributors) if !contributors.is_empty() => {
                let mut total_alpha = 0.0;
                let mut accumulated = Vec3::ZERO;
                for contributor in contributors {
                    let alpha = contributor.intensity(clock.elapsed);
                    total_alpha += alpha;
                    accumulated += contributor.spec.color * alpha;
                }
                total_alpha = total_alpha.min(1.0);
                (base * (1.0 - total_alpha) + accumulated).clamp(Vec3::ZERO, Vec3::ONE)
            }
            _ => base,
        };
        body.color = Color::linear_rgb(blended.x, blended.y, blended.z);
    }
}

/// Drop contributor sets whose target died or despawned. Death overrides
/// the per-buff release discipline.
pub fn sweep_dead_tints(mut compositor: ResMut<TintCompositor>, live: Query<&Health>) {
    compositor.retain_targets(|target| live.get(target).is_ok_and(|h| h.is_alive()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_contributor_intensity_is_alpha() {
        let contributor = TintContributor {
            buff_id: "x".to_string(),
            spec: TintSpec {
                color: Vec3::ONE,
                alpha: 0.4,
                pulse: None,
            },
            phase: 0.0,
        };
        assert_eq!(contributor.intensity(12.34), 0.4);
    }

    #[test]
    fn test_pulse_intensity_stays_clamped() {
        let contributor = TintContributor {
            buff_id: "x".to_string(),
            spec: TintSpec {
                color: Vec3::ONE,
                alpha: 1.0,
                pulse: Some(Pulse {
                    frequency: 2.0,
                    amplitude: 5.0,
                    baseline: 0.5,
                }),
            },
            phase: 0.0,
        };
        for step in 0..100 {
            let now = step as f32 * 0.03;
            let intensity = contributor.intensity(now);
            assert!((0.0..=1.0).contains(&intensity));
        }
    }

    #[test]
    fn test_add_same_buff_id_refreshes_instead_of_duplicating() {
        let mut compositor = TintCompositor::default();
        let target = Entity::from_raw(7);
        let spec = TintSpec {
            color: Vec3::X,
            alpha: 0.3,
            pulse: None,
        };
        compositor.add(target, "src:burn_vfx", spec, 1.0);
        compositor.add(target, "src:burn_vfx", spec, 2.0);
        assert_eq!(compositor.contributor_count(target), 1);
        // Refresh keeps the original phase.
        assert_eq!(compositor.contributors(target).unwrap()[0].phase, 1.0);
    }

    #[test]
    fn test_release_last_contributor_clears_target() {
        let mut compositor = TintCompositor::default();
        let target = Entity::from_raw(7);
        let spec = TintSpec {
            color: Vec3::X,
            alpha: 0.3,
            pulse: None,
        };
        compositor.add(target, "a:slow_vfx", spec, 0.0);
        compositor.add(target, "b:slow_vfx", spec, 0.0);
        compositor.release(target, "a:slow_vfx");
        assert_eq!(compositor.contributor_count(target), 1);
        compositor.release(target, "b:slow_vfx");
        assert!(compositor.contributors(target).is_none());
    }
}
