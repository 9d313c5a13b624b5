//! Reference torus tessellation.
//!
//! The ring is sampled on a closed `radial × tubular` grid with no seam
//! duplicates: vertex `j * tubular + i` sits at tube angle `v = 2π·j/radial`
//! and ring angle `u = 2π·i/tubular`:
//!
//!   x = (R + r·cos v)·cos u
//!   y = (R + r·cos v)·sin u
//!   z = r·sin v
//!
//! Triangles wrap in both directions, so the index list describes a closed
//! 2-manifold with `2 · radial · tubular` faces.

use std::f32::consts::TAU;

use crate::buffer::{
    MAX_VERTICES, ReferenceGeometry, TorusError, validate_positive, validate_segments,
};

/// Shape parameters for one torus instance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TorusShape {
    /// Distance from the torus centre to the centre of the tube.
    pub major_radius: f32,
    /// Radius of the tube.
    pub minor_radius: f32,
    /// Segments around the tube cross-section.
    pub radial_segments: u32,
    /// Segments around the main ring.
    pub tubular_segments: u32,
}

impl Default for TorusShape {
    fn default() -> Self {
        Self {
            major_radius: 8.0,
            minor_radius: 2.0,
            radial_segments: 40,
            tubular_segments: 150,
        }
    }
}

impl TorusShape {
    /// Check every parameter; called at the top of [`TorusShape::build`].
    pub fn validate(&self) -> Result<(), TorusError> {
        validate_positive("major_radius", self.major_radius as f64)?;
        validate_positive("minor_radius", self.minor_radius as f64)?;
        validate_segments("radial_segments", self.radial_segments)?;
        validate_segments("tubular_segments", self.tubular_segments)?;
        let count = self.radial_segments as u64 * self.tubular_segments as u64;
        if count > MAX_VERTICES as u64 {
            return Err(TorusError::TooManyVertices {
                count,
                max: MAX_VERTICES,
            });
        }
        Ok(())
    }

    /// Number of vertices produced by [`TorusShape::build`]: `radial × tubular`.
    pub fn vertex_count(&self) -> usize {
        self.radial_segments as usize * self.tubular_segments as usize
    }

    /// Tessellate the torus and fill its colour buffer with `base_color`.
    pub fn build(&self, base_color: [f32; 3]) -> Result<ReferenceGeometry, TorusError> {
        self.validate()?;
        let radial = self.radial_segments as usize;
        let tubular = self.tubular_segments as usize;
        let n = self.vertex_count();

        let mut positions = Vec::with_capacity(n);
        let mut normals = Vec::with_capacity(n);

        for j in 0..radial {
            let v = TAU * j as f32 / radial as f32;
            let (sin_v, cos_v) = v.sin_cos();
            for i in 0..tubular {
                let u = TAU * i as f32 / tubular as f32;
                let (sin_u, cos_u) = u.sin_cos();
                let ring = self.major_radius + self.minor_radius * cos_v;
                positions.push([ring * cos_u, ring * sin_u, self.minor_radius * sin_v]);
                // Outward tube normal: direction from the tube centre line.
                normals.push([cos_v * cos_u, cos_v * sin_u, sin_v]);
            }
        }

        let mut indices = Vec::with_capacity(n * 6);
        let at = |j: usize, i: usize| ((j % radial) * tubular + (i % tubular)) as u32;
        for j in 0..radial {
            for i in 0..tubular {
                let a = at(j, i);
                let b = at(j + 1, i);
                let c = at(j + 1, i + 1);
                let d = at(j, i + 1);
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        ReferenceGeometry::from_parts(positions, normals, vec![base_color; n], indices)
    }
}

/// Shorthand for building a torus from loose parameters.
pub fn build_torus(
    major_radius: f32,
    minor_radius: f32,
    radial_segments: u32,
    tubular_segments: u32,
    base_color: [f32; 3],
) -> Result<ReferenceGeometry, TorusError> {
    TorusShape {
        major_radius,
        minor_radius,
        radial_segments,
        tubular_segments,
    }
    .build(base_color)
}
