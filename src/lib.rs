//! `bevy_symbios_torus`: noise-driven breathing torus meshes for Bevy.
//!
//! # Architecture
//! [`TorusShape::build`] produces an immutable [`ReferenceGeometry`] per
//! instance.  Every frame [`InstanceSet::advance`] moves one shared
//! [`AnimationClock`] forward and calls [`deform_into`] per instance, which
//! samples a 4D [`NoiseField`] at `(x, y, z, time + phase)` for each vertex,
//! pushes the vertex along its radial direction and blends its colour.
//! Results land in a reused [`WorkingBuffer`]; nothing is reallocated in the
//! render loop.
//!
//! Deformation always reads from the reference, never from the previous
//! frame, so the surface oscillates around its true shape without drift.
//!
//! [`SymbiosTorusPlugin`] wires an [`InstanceSet`] resource into Bevy's
//! schedule; the core types work without an `App`.

pub mod buffer;
pub mod config;
pub mod deform;
pub mod instance;
pub mod noise;
pub mod systems;
pub mod torus;

pub use buffer::{ReferenceGeometry, TorusError, WorkingBuffer, buffer_to_mesh, write_to_mesh};
pub use config::TorusFieldConfig;
pub use crate::noise::{DefaultNoise, NoiseField, SeededNoise};
pub use deform::{DeformParams, DisplacementMode, deform, deform_into};
pub use instance::{AnimationClock, InstanceMaterial, InstanceSet, PhasePolicy, TorusInstance};
pub use systems::{ClockMode, TorusInstanceMesh};
pub use torus::{TorusShape, build_torus};

use bevy::prelude::*;

/// Bevy plugin that spawns instance meshes at startup and animates them every
/// frame.  Expects an [`InstanceSet`] resource; [`ClockMode`] defaults to
/// fixed-step if not inserted.
pub struct SymbiosTorusPlugin;

impl Plugin for SymbiosTorusPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ClockMode>()
            .add_systems(Startup, systems::spawn_instance_meshes)
            .add_systems(
                Update,
                (systems::advance_instance_set, systems::sync_instance_meshes).chain(),
            );
    }
}
