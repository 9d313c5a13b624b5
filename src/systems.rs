//! Bevy systems that drive an [`InstanceSet`] from the render loop.
//!
//! Insert an [`InstanceSet`] resource before the app starts and add
//! [`crate::SymbiosTorusPlugin`]:
//!  * [`spawn_instance_meshes`] (Startup) creates one mesh entity per instance,
//!  * [`advance_instance_set`] (Update) moves the clock and re-deforms,
//!  * [`sync_instance_meshes`] (Update, after advance) copies the working
//!    buffers into the existing mesh attribute storage.
//!
//! # Usage
//! ```rust,ignore
//! let set = TorusFieldConfig::default().build()?;
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(SymbiosTorusPlugin)
//!     .insert_resource(set)
//!     .run();
//! ```

use bevy::prelude::{
    Assets, Color, Commands, Component, DetectChanges, Mesh, Mesh3d, MeshMaterial3d, Query, Res,
    ResMut, Resource, StandardMaterial, Time, Transform,
};

use crate::{
    buffer::{buffer_to_mesh, write_to_mesh},
    instance::InstanceSet,
};

/// How [`advance_instance_set`] derives each frame's clock step.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClockMode {
    /// Add [`InstanceSet::time_step`] once per frame.  Visual speed follows
    /// the display refresh rate.
    #[default]
    FixedStep,
    /// Add the measured frame time multiplied by `scale`.  Visual speed is
    /// independent of the refresh rate.
    Elapsed { scale: f64 },
}

/// Marks the mesh entity rendering instance `index` of the [`InstanceSet`].
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TorusInstanceMesh {
    pub index: usize,
}

/// Startup system: spawn one vertex-coloured mesh entity per instance.
pub fn spawn_instance_meshes(
    mut commands: Commands,
    set: Option<Res<InstanceSet>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(set) = set else {
        bevy::log::warn!("SymbiosTorusPlugin added without an InstanceSet resource");
        return;
    };
    for (index, instance) in set.instances().iter().enumerate() {
        let mesh = meshes.add(buffer_to_mesh(instance.reference(), instance.working()));
        let shading = instance.material();
        // Vertex colours multiply the base colour, so keep it white.
        let material = materials.add(StandardMaterial {
            base_color: Color::WHITE,
            perceptual_roughness: shading.roughness.clamp(0.0, 1.0),
            metallic: shading.metallic.clamp(0.0, 1.0),
            ..Default::default()
        });
        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::default(),
            TorusInstanceMesh { index },
        ));
    }
    bevy::log::debug!("spawned {} torus instance meshes", set.len());
}

/// Update system: advance the shared clock and re-deform every instance.
pub fn advance_instance_set(
    time: Res<Time>,
    mode: Res<ClockMode>,
    set: Option<ResMut<InstanceSet>>,
) {
    let Some(mut set) = set else { return };
    match *mode {
        ClockMode::FixedStep => set.tick(),
        ClockMode::Elapsed { scale } => set.advance(time.delta_secs_f64() * scale),
    }
}

/// Update system: copy changed working buffers into their meshes in place.
pub fn sync_instance_meshes(
    set: Option<Res<InstanceSet>>,
    mut meshes: ResMut<Assets<Mesh>>,
    query: Query<(&TorusInstanceMesh, &Mesh3d)>,
) {
    let Some(set) = set else { return };
    if !set.is_changed() {
        return;
    }
    for (marker, mesh3d) in &query {
        let Some(working) = set.working(marker.index) else {
            bevy::log::error!("mesh refers to missing torus instance {}", marker.index);
            continue;
        };
        let Some(mut mesh) = meshes.get_mut(&mesh3d.0) else {
            continue;
        };
        if let Err(e) = write_to_mesh(&mut mesh, working) {
            bevy::log::error!("failed to sync torus instance {}: {e}", marker.index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::{
        ecs::{system::RunSystemOnce, world::World},
        mesh::VertexAttributeValues,
    };

    use crate::{TorusFieldConfig, TorusShape};

    fn world() -> World {
        let config = TorusFieldConfig {
            seed: Some(42),
            shape: TorusShape {
                radial_segments: 6,
                tubular_segments: 12,
                ..TorusShape::default()
            },
            instance_count: 2,
            ..Default::default()
        };
        let mut world = World::new();
        world.insert_resource(Assets::<Mesh>::default());
        world.insert_resource(Assets::<StandardMaterial>::default());
        world.insert_resource(Time::<()>::default());
        world.insert_resource(ClockMode::FixedStep);
        world.insert_resource(config.build().unwrap());
        world
    }

    #[test]
    fn meshes_follow_working_buffers() {
        let mut world = world();
        world.run_system_once(spawn_instance_meshes).unwrap();
        world.run_system_once(advance_instance_set).unwrap();
        world.run_system_once(sync_instance_meshes).unwrap();

        let set = world.resource::<InstanceSet>();
        assert_eq!(set.frame(), 1);
        let meshes = world.resource::<Assets<Mesh>>();
        let mut seen = 0;
        let mut query = world.try_query::<(&TorusInstanceMesh, &Mesh3d)>().unwrap();
        for (marker, mesh3d) in query.iter(&world) {
            let mesh = meshes.get(&mesh3d.0).unwrap();
            let Some(VertexAttributeValues::Float32x3(positions)) =
                mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            else {
                panic!("positions missing");
            };
            let working = set.working(marker.index).unwrap();
            assert_eq!(positions.as_slice(), working.positions());
            assert_ne!(positions.as_slice(), set.instances()[marker.index].reference().positions());
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn elapsed_mode_scales_frame_time() {
        let mut world = world();
        world.insert_resource(ClockMode::Elapsed { scale: 2.0 });
        world
            .resource_mut::<Time>()
            .advance_by(std::time::Duration::from_millis(250));
        world.run_system_once(advance_instance_set).unwrap();
        assert!((world.resource::<InstanceSet>().time() - 0.5).abs() < 1e-9);
    }
}
