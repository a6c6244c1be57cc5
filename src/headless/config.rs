//! JSON scenario configuration for headless runs.
//!
//! A scenario places named dummies on the range and schedules timed volleys
//! of projectiles with effect loadouts at them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::effects::registry::{EffectKind, EffectSpec};

fn default_health() -> f32 {
    150.0
}

fn default_move_speed() -> f32 {
    3.0
}

fn default_patrol_span() -> f32 {
    4.0
}

fn default_speed() -> f32 {
    16.0
}

fn default_tier() -> u8 {
    1
}

fn default_duration() -> f32 {
    30.0
}

/// One dummy in the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Unique display name, used in results and the event log
    pub name: String,
    #[serde(default = "default_health")]
    pub health: f32,
    /// XZ position on the range
    pub position: [f32; 2],
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_patrol_span")]
    pub patrol_span: f32,
}

/// One scheduled projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolleySpec {
    /// Simulation time at which the volley fires, in seconds
    pub at: f32,
    /// Stable source identity (buffs from the same source merge on re-hit)
    pub source_id: String,
    /// XZ position the projectile launches from
    pub origin: [f32; 2],
    /// Index into `targets` the volley is aimed at
    pub target: usize,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub damage: f32,
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// Effect descriptors in application order
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
}

/// Headless scenario loaded from JSON
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub volleys: Vec<VolleySpec>,
    /// Simulation seconds before the run ends (default: 30)
    #[serde(default = "default_duration")]
    pub duration_secs: f32,
    /// Random seed for deterministic reproduction
    #[serde(default)]
    pub seed: Option<u64>,
    /// Custom output path for the JSON result (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

impl ScenarioConfig {
    /// Load a scenario from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario file: {}", e))?;

        let config: ScenarioConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the scenario
    pub fn validate(&self) -> Result<(), String> {
        if self.targets.is_empty() {
            return Err("scenario needs at least one target".to_string());
        }
        for (i, target) in self.targets.iter().enumerate() {
            if target.name.is_empty() {
                return Err(format!("target {} has an empty name", i));
            }
            if self.targets.iter().filter(|t| t.name == target.name).count() > 1 {
                return Err(format!("duplicate target name '{}'", target.name));
            }
            if target.health <= 0.0 {
                return Err(format!("target '{}' must have positive health", target.name));
            }
        }

        for (i, volley) in self.volleys.iter().enumerate() {
            if volley.at < 0.0 {
                return Err(format!("volley {} fires at negative time", i));
            }
            if volley.source_id.is_empty() {
                return Err(format!("volley {} has an empty source_id", i));
            }
            if volley.target >= self.targets.len() {
                return Err(format!(
                    "volley {} targets index {} but only {} targets exist",
                    i,
                    volley.target,
                    self.targets.len()
                ));
            }
            if volley.speed <= 0.0 {
                return Err(format!("volley {} must have positive speed", i));
            }
            for spec in &volley.effects {
                Self::validate_effect(i, spec)?;
            }
        }

        if self.duration_secs <= 0.0 {
            return Err("duration_secs must be positive".to_string());
        }

        Ok(())
    }

    fn validate_effect(volley_index: usize, spec: &EffectSpec) -> Result<(), String> {
        let fail = |msg: &str| Err(format!("volley {}: {}", volley_index, msg));
        match spec.kind {
            EffectKind::Burn => {
                if spec.magnitude <= 0.0 {
                    return fail("burn needs positive damage per tick");
                }
                if spec.duration <= 0.0 {
                    return fail("burn needs a positive duration");
                }
                if spec.tick_interval <= 0.0 {
                    return fail("burn needs a positive tick interval");
                }
            }
            EffectKind::Slow => {
                if !(0.0..1.0).contains(&spec.magnitude) {
                    return fail("slow factor must be in [0, 1)");
                }
                if spec.duration <= 0.0 {
                    return fail("slow needs a positive duration");
                }
            }
            EffectKind::Knockback => {
                if spec.magnitude <= 0.0 {
                    return fail("knockback needs positive strength");
                }
            }
            EffectKind::Ricochet => {
                if spec.bounces == 0 {
                    return fail("ricochet needs at least one bounce");
                }
                if !(0.0..=180.0).contains(&spec.spread_degrees) {
                    return fail("ricochet spread must be within [0, 180] degrees");
                }
            }
            EffectKind::Pierce => {
                if spec.pierces == 0 {
                    return fail("pierce needs at least one pass-through");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ScenarioConfig {
        ScenarioConfig {
            targets: vec![TargetSpec {
                name: "dummy".to_string(),
                health: 100.0,
                position: [0.0, 0.0],
                move_speed: 3.0,
                patrol_span: 4.0,
            }],
            volleys: vec![],
            duration_secs: 10.0,
            seed: None,
            output_path: None,
        }
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_volley_target() {
        let mut config = minimal_config();
        config.volleys.push(VolleySpec {
            at: 1.0,
            source_id: "e".to_string(),
            origin: [-10.0, 0.0],
            target: 3,
            speed: 16.0,
            damage: 2.0,
            tier: 1,
            effects: vec![],
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_bounce_ricochet() {
        let mut config = minimal_config();
        config.volleys.push(VolleySpec {
            at: 1.0,
            source_id: "e".to_string(),
            origin: [-10.0, 0.0],
            target: 0,
            speed: 16.0,
            damage: 2.0,
            tier: 1,
            effects: vec![EffectSpec {
                bounces: 0,
                ..EffectSpec::ricochet(1)
            }],
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_sparse_json() {
        let json = r#"{
            "targets": [{ "name": "dummy-1", "position": [4.0, 0.0] }],
            "volleys": [{
                "at": 0.5,
                "source_id": "west",
                "origin": [-12.0, 0.0],
                "target": 0,
                "effects": [{ "kind": "Burn", "magnitude": 3.0, "duration": 5.0 }]
            }]
        }"#;
        let config: ScenarioConfig = serde_json::from_str(json).expect("should parse");
        assert!(config.validate().is_ok());
        assert_eq!(config.targets[0].health, default_health());
        assert_eq!(config.volleys[0].effects[0].tick_interval, 1.0);
        assert_eq!(config.duration_secs, default_duration());
    }
}
