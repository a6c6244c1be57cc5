//! Integration tests for the effect application pipeline
//!
//! These tests verify that:
//! - Concrete handlers install/apply their advertised semantics
//! - Ricochet and pierce negotiate the shared destroy flag in declaration
//!   order, with pierce deferring to a fresh bounce
//! - A failing install falls back to the one-shot apply path
//! - Unknown effect kinds are skipped without aborting the rest
//! - Deferred installs resolve later and cancel against dead targets

use bevy::prelude::*;

use volleysim::combat::{CombatPlugin, GameRng, SimClock};
use volleysim::effects::host::BodyColor;
use volleysim::effects::pipeline::apply_effects;
use volleysim::effects::registry::{
    EffectContext, EffectHandler, EffectKind, EffectRegistry, EffectSpec, InstallOutcome,
};
use volleysim::effects::{
    ActiveSlows, BuffManager, EffectEnginePlugin, EffectError, EffectHost, Health, MoveSpeed,
    PendingInstalls, Projectile, Stunned, Velocity,
};

fn test_app(step: f32) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, CombatPlugin, EffectEnginePlugin));
    app.insert_resource(GameRng::from_seed(7));
    app.world_mut().resource_mut::<SimClock>().fixed_step = Some(step);
    app
}

fn spawn_target(app: &mut App, name: &str, position: Vec3, health: f32) -> Entity {
    app.world_mut()
        .spawn((
            Name::new(name.to_string()),
            Health::new(health),
            MoveSpeed::new(4.0),
            Velocity::default(),
            BodyColor {
                color: Color::WHITE,
            },
            Transform::from_translation(position),
            BuffManager::new(),
        ))
        .id()
}

fn spawn_projectile(
    app: &mut App,
    source_id: &str,
    position: Vec3,
    velocity: Vec3,
    effects: Vec<EffectSpec>,
) -> Entity {
    app.world_mut()
        .spawn((
            Projectile::new(source_id, velocity, 4.0).with_effects(effects),
            Transform::from_translation(position),
        ))
        .id()
}

// =============================================================================
// Concrete handler semantics
// =============================================================================

#[test]
fn test_burn_install_registers_damage_and_vfx_buffs() {
    let mut app = test_app(1.0);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::burn(3.0, 5.0, 1.0)],
    );

    apply_effects(app.world_mut(), projectile, target);

    let manager = app.world().get::<BuffManager>(target).unwrap();
    let burn = manager.get("west:burn").expect("burn buff installed");
    assert_eq!(burn.duration, Some(5.0));
    assert_eq!(burn.tick_interval, Some(1.0));
    assert!(manager.contains("west:burn_vfx"));

    // Five seconds of updates deliver all five ticks, then the buff expires.
    for _ in 0..6 {
        app.update();
    }
    let health = app.world().get::<Health>(target).unwrap().current;
    assert!((health - 85.0).abs() < 1e-3, "expected 5 ticks of 3, health {}", health);
    assert!(!app
        .world()
        .get::<BuffManager>(target)
        .unwrap()
        .contains("west:burn"));
}

#[test]
fn test_slows_from_two_sources_compose_multiplicatively() {
    let mut app = test_app(1.0);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);

    let first = spawn_projectile(
        &mut app,
        "chiller-a",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::slow(0.3, 10.0)],
    );
    let second = spawn_projectile(
        &mut app,
        "chiller-b",
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::NEG_X * 16.0,
        vec![EffectSpec::slow(0.5, 10.0)],
    );

    apply_effects(app.world_mut(), first, target);
    apply_effects(app.world_mut(), second, target);

    let speed = app.world().get::<MoveSpeed>(target).unwrap().current;
    assert!((speed - 4.0 * 0.7 * 0.5).abs() < 1e-4, "speed was {}", speed);

    // Removing one slow restores the other's factor, recomputed from the
    // base-stat snapshot rather than compounded.
    EffectHost::new(app.world_mut()).remove_buff(target, "chiller-a:slow");
    let speed = app.world().get::<MoveSpeed>(target).unwrap().current;
    assert!((speed - 4.0 * 0.5).abs() < 1e-4, "speed was {}", speed);

    EffectHost::new(app.world_mut()).remove_buff(target, "chiller-b:slow");
    let speed = app.world().get::<MoveSpeed>(target).unwrap().current;
    assert!((speed - 4.0).abs() < 1e-4, "speed was {}", speed);
    assert!(app.world().get::<ActiveSlows>(target).unwrap().is_empty());
}

#[test]
fn test_repeated_slow_from_same_source_refreshes_without_stacking() {
    let mut app = test_app(1.0);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);

    for _ in 0..3 {
        let projectile = spawn_projectile(
            &mut app,
            "chiller",
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::X * 16.0,
            vec![EffectSpec::slow(0.4, 10.0)],
        );
        apply_effects(app.world_mut(), projectile, target);
    }

    let speed = app.world().get::<MoveSpeed>(target).unwrap().current;
    assert!(
        (speed - 4.0 * 0.6).abs() < 1e-4,
        "three hits from one source must not compound: speed {}",
        speed
    );
    assert_eq!(app.world().get::<ActiveSlows>(target).unwrap().len(), 1);
}

#[test]
fn test_knockback_shoves_away_from_source_and_stuns() {
    let mut app = test_app(0.1);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let source = app
        .world_mut()
        .spawn(Transform::from_xyz(-6.0, 0.0, 0.0))
        .id();

    let projectile = {
        app.world_mut()
            .spawn((
                Projectile::new("ram", Vec3::X * 18.0, 4.0)
                    .from_source(source)
                    .with_effects(vec![EffectSpec::knockback(9.0)]),
                Transform::from_xyz(-0.5, 1.0, 0.0),
            ))
            .id()
    };
    apply_effects(app.world_mut(), projectile, target);

    let velocity = app.world().get::<Velocity>(target).unwrap().0;
    assert!(velocity.x > 8.0, "push must point away from the source");
    assert!(app.world().get::<Stunned>(target).is_some());

    // The stun is a short buff; it releases on its own.
    for _ in 0..6 {
        app.update();
    }
    assert!(app.world().get::<Stunned>(target).is_none());
}

// =============================================================================
// Ricochet / pierce negotiation
// =============================================================================

#[test]
fn test_ricochet_then_pierce_share_the_destroy_flag_in_order() {
    let mut app = test_app(1.0);
    let first = spawn_target(&mut app, "dummy-a", Vec3::ZERO, 100.0);
    let second = spawn_target(&mut app, "dummy-b", Vec3::new(6.0, 0.0, 2.0), 100.0);
    let third = spawn_target(&mut app, "dummy-c", Vec3::new(-6.0, 0.0, 4.0), 100.0);

    let projectile = spawn_projectile(
        &mut app,
        "trick",
        Vec3::new(-1.2, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::ricochet(1), EffectSpec::pierce(1)],
    );

    // First hit: the bounce is consumed, the pierce defers to it.
    apply_effects(app.world_mut(), projectile, first);
    {
        let proj = app.world().get::<Projectile>(projectile).unwrap();
        assert_eq!(proj.bounces_left, 0);
        assert_eq!(proj.pierces_left, 1, "pierce defers on the bounce hit");
        assert!(proj.just_bounced);
        assert!(!proj.should_destroy_after_hit);
        assert!(proj.velocity.x < 0.0, "velocity reflected off the impact");
        assert!((proj.speed() - 16.0).abs() < 1e-3, "bounce keeps the speed");
    }

    // Next frame the flight system expires the bounce flag.
    app.world_mut()
        .get_mut::<Projectile>(projectile)
        .unwrap()
        .just_bounced = false;

    // Second hit: no bounces left, so the pierce activates and keeps the
    // projectile alive (last writer wins over ricochet's destroy vote).
    apply_effects(app.world_mut(), projectile, second);
    {
        let proj = app.world().get::<Projectile>(projectile).unwrap();
        assert_eq!(proj.pierces_left, 0);
        assert!(!proj.should_destroy_after_hit);
        assert!(proj.has_hit(second));
    }

    // Third hit: both counters exhausted, the projectile is done.
    apply_effects(app.world_mut(), projectile, third);
    let proj = app.world().get::<Projectile>(projectile).unwrap();
    assert!(proj.should_destroy_after_hit);
}

#[test]
fn test_pierce_deduplicates_repeat_hits_on_same_target() {
    let mut app = test_app(1.0);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);

    let projectile = spawn_projectile(
        &mut app,
        "lance",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::pierce(3)],
    );

    apply_effects(app.world_mut(), projectile, target);
    apply_effects(app.world_mut(), projectile, target);

    let proj = app.world().get::<Projectile>(projectile).unwrap();
    assert_eq!(
        proj.pierces_left, 2,
        "a repeat hit on the same target must not consume a second pierce"
    );
}

// =============================================================================
// Pipeline error containment & fallback
// =============================================================================

struct FailingInstallHandler;

impl EffectHandler for FailingInstallHandler {
    fn install(
        &self,
        _target: Entity,
        _ctx: &EffectContext,
        _host: &mut EffectHost,
    ) -> Option<Result<InstallOutcome, EffectError>> {
        Some(Err(EffectError::Failed("install exploded".to_string())))
    }

    fn apply(
        &self,
        target: Entity,
        _ctx: &EffectContext,
        _projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        Some(host.deal_damage(target, 7.0, None, "Fallback").map(|_| ()))
    }
}

#[test]
fn test_failed_install_falls_back_to_apply() {
    let mut app = test_app(1.0);
    app.world_mut()
        .resource_mut::<EffectRegistry>()
        .set_handler(EffectKind::Burn, Box::new(FailingInstallHandler));

    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::burn(3.0, 5.0, 1.0)],
    );

    apply_effects(app.world_mut(), projectile, target);

    assert_eq!(
        app.world().get::<Health>(target).unwrap().current,
        93.0,
        "apply must run with the same target/context after install fails"
    );
}

#[test]
fn test_unknown_effect_kind_is_skipped_and_rest_still_process() {
    let mut app = test_app(1.0);
    app.world_mut()
        .resource_mut::<EffectRegistry>()
        .clear_handler(EffectKind::Slow);

    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::slow(0.5, 5.0), EffectSpec::burn(3.0, 5.0, 1.0)],
    );

    apply_effects(app.world_mut(), projectile, target);

    // The unresolved slow is skipped, the burn after it still installs.
    let manager = app.world().get::<BuffManager>(target).unwrap();
    assert!(!manager.contains("west:slow"));
    assert!(manager.contains("west:burn"));
    assert_eq!(
        app.world().get::<MoveSpeed>(target).unwrap().current,
        4.0
    );
}

#[test]
fn test_install_on_dead_target_declines_without_side_effects() {
    let mut app = test_app(1.0);
    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    app.world_mut().get_mut::<Health>(target).unwrap().current = 0.0;

    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::burn(3.0, 5.0, 1.0), EffectSpec::slow(0.4, 5.0)],
    );
    apply_effects(app.world_mut(), projectile, target);

    let manager = app.world().get::<BuffManager>(target).unwrap();
    assert!(manager.is_empty(), "a dead target takes no buffs");
    assert_eq!(app.world().get::<Health>(target).unwrap().current, 0.0);
    assert_eq!(app.world().get::<MoveSpeed>(target).unwrap().current, 4.0);
}

// =============================================================================
// Deferred installs
// =============================================================================

struct DeferringHandler;

impl EffectHandler for DeferringHandler {
    fn install(
        &self,
        _target: Entity,
        _ctx: &EffectContext,
        _host: &mut EffectHost,
    ) -> Option<Result<InstallOutcome, EffectError>> {
        Some(Ok(InstallOutcome::Deferred))
    }

    fn apply(
        &self,
        target: Entity,
        _ctx: &EffectContext,
        _projectile: &mut Projectile,
        host: &mut EffectHost,
    ) -> Option<Result<(), EffectError>> {
        Some(host.deal_damage(target, 5.0, None, "Deferred fallback").map(|_| ()))
    }
}

#[test]
fn test_deferred_install_eventually_runs_fallback_apply() {
    let mut app = test_app(0.1);
    app.world_mut()
        .resource_mut::<EffectRegistry>()
        .set_handler(EffectKind::Burn, Box::new(DeferringHandler));

    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::burn(3.0, 5.0, 1.0)],
    );

    apply_effects(app.world_mut(), projectile, target);
    assert_eq!(app.world().resource::<PendingInstalls>().len(), 1);
    assert_eq!(app.world().get::<Health>(target).unwrap().current, 100.0);

    // Each frame retries once; when the retry budget runs out the one-shot
    // fallback fires.
    for _ in 0..4 {
        app.update();
    }
    assert!(app.world().resource::<PendingInstalls>().is_empty());
    assert_eq!(app.world().get::<Health>(target).unwrap().current, 95.0);
}

#[test]
fn test_deferred_install_cancels_when_target_dies() {
    let mut app = test_app(0.1);
    app.world_mut()
        .resource_mut::<EffectRegistry>()
        .set_handler(EffectKind::Burn, Box::new(DeferringHandler));

    let target = spawn_target(&mut app, "dummy", Vec3::ZERO, 100.0);
    let projectile = spawn_projectile(
        &mut app,
        "west",
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::X * 16.0,
        vec![EffectSpec::burn(3.0, 5.0, 1.0)],
    );

    apply_effects(app.world_mut(), projectile, target);
    assert_eq!(app.world().resource::<PendingInstalls>().len(), 1);

    // The target dies before the deferred install resolves.
    app.world_mut().get_mut::<Health>(target).unwrap().current = 0.0;
    app.update();

    assert!(
        app.world().resource::<PendingInstalls>().is_empty(),
        "a dead target cancels the continuation"
    );
    assert_eq!(
        app.world().get::<Health>(target).unwrap().current,
        0.0,
        "no post-resolution side effects may touch a dead target"
    );
}
