//! `breathing_torus`: three noise-deformed tori under the reference lights.
//!
//! Run with:
//!   cargo run --example breathing_torus
//!
//! An optional JSON config path may be given as the first argument; any
//! field left out falls back to `TorusFieldConfig::default()`.

use bevy::prelude::*;
use bevy_symbios_torus::{SymbiosTorusPlugin, TorusFieldConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str::<TorusFieldConfig>(&std::fs::read_to_string(path)?)?,
        None => TorusFieldConfig::default(),
    };
    let set = config.build()?;

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "bevy_symbios_torus: breathing torus".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SymbiosTorusPlugin)
        .insert_resource(set)
        .insert_resource(config.clock)
        .add_systems(Startup, spawn_scene)
        .run();
    Ok(())
}

fn spawn_scene(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, -6.0, 24.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));

    let lights = [
        (Vec3::new(10.0, 10.0, 10.0), Color::WHITE),
        (Vec3::new(12.0, 0.0, -2.0), Color::srgb_u8(0x2f, 0x00, 0x00)),
        (Vec3::new(-12.0, 0.0, -2.0), Color::srgb_u8(0x00, 0x00, 0x2f)),
    ];
    for (position, color) in lights {
        commands.spawn((
            PointLight {
                color,
                intensity: 2_000_000.0,
                range: 60.0,
                ..default()
            },
            Transform::from_translation(position),
        ));
    }
    commands.spawn((
        SpotLight {
            intensity: 1_000_000.0,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 0.0).looking_at(Vec3::Z, Vec3::Y),
    ));
}
