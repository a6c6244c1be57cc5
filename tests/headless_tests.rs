//! Integration tests for headless scenario execution
//!
//! These tests verify that:
//! - Scenarios run to completion and report programmatic results
//! - Seeded runs reproduce exactly
//! - Target destruction ends the run early
//! - Invalid scenarios are rejected before anything runs

use volleysim::effects::registry::EffectSpec;
use volleysim::headless::{run_headless_sim, ScenarioConfig, TargetSpec, VolleySpec};

fn one_dummy_config(seed: Option<u64>) -> ScenarioConfig {
    ScenarioConfig {
        targets: vec![TargetSpec {
            name: "dummy-1".to_string(),
            health: 150.0,
            position: [6.0, 0.0],
            move_speed: 0.0,
            patrol_span: 0.0,
        }],
        volleys: vec![VolleySpec {
            at: 0.5,
            source_id: "west-emitter".to_string(),
            origin: [-8.0, 0.0],
            target: 0,
            speed: 16.0,
            damage: 5.0,
            tier: 1,
            effects: vec![
                EffectSpec::burn(3.0, 5.0, 1.0),
                EffectSpec::slow(0.4, 4.0),
            ],
        }],
        duration_secs: 10.0,
        seed,
        output_path: None,
    }
}

#[test]
fn test_scenario_runs_to_completion() {
    let result = run_headless_sim(one_dummy_config(Some(42))).expect("run should succeed");

    assert!(result.completed_at >= 10.0, "run lasts the full duration");
    assert_eq!(result.seed, Some(42));
    assert_eq!(result.targets.len(), 1);

    let outcome = &result.targets[0];
    assert_eq!(outcome.name, "dummy-1");
    assert!(outcome.survived);
    // Impact (5) plus five burn ticks (3 each) = 20 total.
    assert!(
        (outcome.final_health - 130.0).abs() < 1.0,
        "expected ~130 health, got {}",
        outcome.final_health
    );

    assert_eq!(result.events.hits, 1);
    assert!(result.events.damage >= 6, "impact plus burn ticks");
    // burn + burn_vfx + slow + slow_vfx
    assert!(result.events.buffs_applied >= 4);
    assert!(result.events.buffs_removed >= 4, "all buffs expire in 10s");
    assert_eq!(result.events.deaths, 0);
    assert_eq!(result.events.faults, 0);
}

#[test]
fn test_seeded_runs_are_deterministic() {
    let first = run_headless_sim(one_dummy_config(Some(1234))).expect("first run");
    let second = run_headless_sim(one_dummy_config(Some(1234))).expect("second run");

    assert_eq!(first.completed_at, second.completed_at);
    assert_eq!(
        first.targets[0].final_health,
        second.targets[0].final_health
    );
    assert_eq!(first.events.damage, second.events.damage);
    assert_eq!(first.events.buffs_applied, second.events.buffs_applied);
}

#[test]
fn test_destroying_every_target_ends_the_run_early() {
    let mut config = one_dummy_config(Some(7));
    config.targets[0].health = 4.0;
    config.volleys[0].damage = 50.0;
    config.volleys[0].effects = vec![];

    let result = run_headless_sim(config).expect("run should succeed");

    assert!(
        result.completed_at < 5.0,
        "the run ends once the only target is destroyed, ended at {}",
        result.completed_at
    );
    assert!(!result.targets[0].survived);
    assert_eq!(result.targets[0].final_health, 0.0);
    assert_eq!(result.events.deaths, 1);
}

#[test]
fn test_knockback_volley_shoves_the_target() {
    let mut config = one_dummy_config(Some(9));
    config.volleys[0].effects = vec![EffectSpec::knockback(12.0)];

    let result = run_headless_sim(config).expect("run should succeed");

    // The knockback stun buff and its icon were applied and later expired.
    assert!(result.events.buffs_applied >= 2);
    assert!(result.events.buffs_removed >= 2);
    assert_eq!(result.events.faults, 0);
}

#[test]
fn test_invalid_scenario_is_rejected() {
    let mut config = one_dummy_config(None);
    config.volleys[0].target = 5;

    let error = run_headless_sim(config).expect_err("out-of-range target must fail");
    assert!(error.contains("target"), "unexpected error text: {}", error);
}

#[test]
fn test_missing_targets_are_rejected() {
    let config = ScenarioConfig {
        targets: vec![],
        volleys: vec![],
        duration_secs: 5.0,
        seed: None,
        output_path: None,
    };
    assert!(run_headless_sim(config).is_err());
}
