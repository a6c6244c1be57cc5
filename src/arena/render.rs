//! Graphical layer for the sandbox arena.
//!
//! Meshes attach to logic entities after they spawn (`Added<T>` queries), so
//! the simulation itself never touches render assets and the headless
//! runner can drop this plugin entirely. The tint compositor writes
//! `BodyColor`; this layer just copies it into each dummy's material.

use bevy::prelude::*;

use crate::combat::SimulationSpeed;
use crate::effects::host::BodyColor;
use crate::effects::pipeline::Projectile;
use crate::effects::vfx::overlay::{OverlayKind, OverlayNode};
use crate::effects::EffectPhase;

use super::targets::Dummy;
use super::{Emitter, ARENA_HALF_SIZE};

pub struct ArenaRenderPlugin;

impl Plugin for ArenaRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene).add_systems(
            Update,
            (
                attach_dummy_meshes,
                attach_emitter_meshes,
                attach_projectile_meshes,
                attach_overlay_meshes,
                sync_body_colors.after(EffectPhase::Visuals),
                speed_hotkeys,
            ),
        );
    }
}

/// Camera, light, and the range floor.
fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 28.0, 26.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(12.0, 24.0, 8.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let floor = meshes.add(Plane3d::default().mesh().size(
        ARENA_HALF_SIZE * 2.0,
        ARENA_HALF_SIZE * 2.0,
    ));
    commands.spawn((
        Mesh3d(floor),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.25, 0.28, 0.25),
            perceptual_roughness: 0.95,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.0, 0.0),
    ));
}

/// Give newly spawned dummies a capsule body. Each dummy gets its own
/// material instance so the tint compositor can drive it independently.
fn attach_dummy_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    new_dummies: Query<(Entity, &BodyColor), (Added<Dummy>, Without<Mesh3d>)>,
) {
    for (entity, body) in new_dummies.iter() {
        let mesh = meshes.add(Capsule3d::new(0.5, 1.2));
        let material = materials.add(StandardMaterial {
            base_color: body.color,
            ..default()
        });
        commands.entity(entity).try_insert((Mesh3d(mesh), MeshMaterial3d(material)));
    }
}

fn attach_emitter_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    new_emitters: Query<Entity, (Added<Emitter>, Without<Mesh3d>)>,
) {
    for entity in new_emitters.iter() {
        let mesh = meshes.add(Cuboid::new(1.0, 1.4, 1.0));
        let material = materials.add(StandardMaterial {
            base_color: Color::srgb(0.35, 0.35, 0.42),
            ..default()
        });
        commands.entity(entity).try_insert((Mesh3d(mesh), MeshMaterial3d(material)));
    }
}

/// Small glowing spheres for projectiles.
fn attach_projectile_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    new_projectiles: Query<Entity, (Added<Projectile>, Without<Mesh3d>)>,
) {
    for entity in new_projectiles.iter() {
        let mesh = meshes.add(Sphere::new(0.25));
        let material = materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.85, 0.4),
            emissive: LinearRgba::rgb(1.4, 1.1, 0.5),
            ..default()
        });
        commands.entity(entity).try_insert((Mesh3d(mesh), MeshMaterial3d(material)));
    }
}

/// Icons for overlay nodes, colored per kind.
fn attach_overlay_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    new_nodes: Query<(Entity, &OverlayNode), (Added<OverlayNode>, Without<Mesh3d>)>,
) {
    for (entity, node) in new_nodes.iter() {
        let (base_color, emissive) = match node.kind {
            OverlayKind::Flame => (
                Color::srgb(1.0, 0.45, 0.1),
                LinearRgba::rgb(2.0, 0.8, 0.1),
            ),
            OverlayKind::Frost => (
                Color::srgb(0.4, 0.7, 1.0),
                LinearRgba::rgb(0.6, 1.0, 1.8),
            ),
            OverlayKind::Stars => (
                Color::srgb(1.0, 0.95, 0.4),
                LinearRgba::rgb(1.8, 1.6, 0.5),
            ),
        };
        let mesh = meshes.add(Sphere::new(0.18));
        let material = materials.add(StandardMaterial {
            base_color,
            emissive,
            ..default()
        });
        commands.entity(entity).try_insert((Mesh3d(mesh), MeshMaterial3d(material)));
    }
}

/// Copy the composited body color into each dummy's material.
fn sync_body_colors(
    dummies: Query<(&BodyColor, &MeshMaterial3d<StandardMaterial>), With<Dummy>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (body, material_handle) in dummies.iter() {
        if let Some(material) = materials.get_mut(&material_handle.0) {
            material.base_color = body.color;
        }
    }
}

/// Space toggles pause, 1/2 set normal/double speed.
fn speed_hotkeys(keys: Res<ButtonInput<KeyCode>>, mut speed: ResMut<SimulationSpeed>) {
    if keys.just_pressed(KeyCode::Space) {
        if speed.is_paused() {
            speed.normal_speed();
        } else {
            speed.pause();
        }
    }
    if keys.just_pressed(KeyCode::Digit1) {
        speed.normal_speed();
    }
    if keys.just_pressed(KeyCode::Digit2) {
        speed.double_speed();
    }
}
