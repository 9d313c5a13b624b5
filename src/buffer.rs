//! Vertex buffers shared by the geometry factory, the deformation engine and
//! the render host.

use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, Mesh, MeshVertexAttribute, PrimitiveTopology, VertexAttributeValues},
};

/// Error returned by geometry construction and buffer bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum TorusError {
    /// A construction input was out of its valid domain.
    InvalidParameter {
        name: &'static str,
        value: f64,
        requirement: &'static str,
    },
    /// Two buffers that must share a length did not.  Always a programming
    /// error, never a consequence of user input.
    InvariantViolation {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The requested tessellation exceeds [`MAX_VERTICES`].
    TooManyVertices { count: u64, max: u32 },
}

impl std::fmt::Display for TorusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TorusError::InvalidParameter {
                name,
                value,
                requirement,
            } => write!(f, "invalid parameter `{name}` = {value}: {requirement}"),
            TorusError::InvariantViolation {
                what,
                expected,
                actual,
            } => write!(
                f,
                "buffer invariant violated ({what}): expected length {expected}, got {actual}"
            ),
            TorusError::TooManyVertices { count, max } => {
                write!(f, "torus needs {count} vertices, exceeding MAX_VERTICES={max}")
            }
        }
    }
}

impl std::error::Error for TorusError {}

/// Maximum vertex count for one torus instance.
///
/// Keeps triangle indices inside `u32` and bounds the per-frame cost: every
/// vertex costs one 4D noise sample per instance per frame.
pub const MAX_VERTICES: u32 = 1 << 22;

/// Reject non-finite or non-positive values.
#[inline]
pub fn validate_positive(name: &'static str, value: f64) -> Result<(), TorusError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(TorusError::InvalidParameter {
            name,
            value,
            requirement: "must be finite and strictly positive",
        });
    }
    Ok(())
}

/// Reject segment counts that would degenerate the ring.
#[inline]
pub fn validate_segments(name: &'static str, value: u32) -> Result<(), TorusError> {
    if value < 3 {
        return Err(TorusError::InvalidParameter {
            name,
            value: value as f64,
            requirement: "must be at least 3",
        });
    }
    Ok(())
}

#[inline]
pub(crate) fn check_len(
    what: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), TorusError> {
    if expected != actual {
        return Err(TorusError::InvariantViolation {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Undisplaced mesh for one instance.  Never mutated after construction.
///
/// All buffers are indexed by vertex: index `i` names the same point in
/// `positions`, `normals`, `colors` and in every [`WorkingBuffer`] derived
/// from this geometry.
#[derive(Clone, Debug)]
pub struct ReferenceGeometry {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl ReferenceGeometry {
    /// Assemble a geometry from raw buffers, checking that the per-vertex
    /// buffers agree in length and that every index is in range.
    pub fn from_parts(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        colors: Vec<[f32; 3]>,
        indices: Vec<u32>,
    ) -> Result<Self, TorusError> {
        let n = positions.len();
        check_len("reference normals", n, normals.len())?;
        check_len("reference colors", n, colors.len())?;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= n) {
            return Err(TorusError::InvariantViolation {
                what: "triangle index out of range",
                expected: n,
                actual: bad as usize,
            });
        }
        Ok(Self {
            positions,
            normals,
            colors,
            indices,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Initial uniform vertex colours in linear RGB.
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Triangle list indices (three per triangle).
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Mutable per-instance storage for the current frame's positions and colours.
///
/// Allocated once from a [`ReferenceGeometry`] and then overwritten in place
/// every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingBuffer {
    pub(crate) positions: Vec<[f32; 3]>,
    pub(crate) colors: Vec<[f32; 3]>,
}

impl WorkingBuffer {
    /// A buffer holding the undisplaced reference positions and initial colours.
    pub fn from_reference(reference: &ReferenceGeometry) -> Self {
        Self {
            positions: reference.positions.clone(),
            colors: reference.colors.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Current vertex colours in linear RGB.
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }
}

/// Build a renderable [`Mesh`] for one instance.
///
/// The mesh keeps a main-world copy so [`write_to_mesh`] can update its
/// attribute storage in place on later frames.  Normals come from the
/// reference and are not recomputed as the surface deforms.
pub fn buffer_to_mesh(reference: &ReferenceGeometry, working: &WorkingBuffer) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, working.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, reference.normals.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, rgba(&working.colors));
    mesh.insert_indices(Indices::U32(reference.indices.clone()));
    mesh
}

/// Copy a working buffer into an existing mesh's position and colour
/// attributes without reallocating them.
///
/// Fails with [`TorusError::InvariantViolation`] when the mesh attribute has
/// a different length or format than the buffer; the mesh is left untouched
/// in that case.
pub fn write_to_mesh(mesh: &mut Mesh, working: &WorkingBuffer) -> Result<(), TorusError> {
    let n = working.len();

    let positions_ok = matches!(
        mesh.attribute(Mesh::ATTRIBUTE_POSITION),
        Some(VertexAttributeValues::Float32x3(dst)) if dst.len() == n
    );
    if !positions_ok {
        return Err(TorusError::InvariantViolation {
            what: "mesh positions (Float32x3)",
            expected: n,
            actual: attribute_len(mesh, Mesh::ATTRIBUTE_POSITION),
        });
    }
    let colors_ok = matches!(
        mesh.attribute(Mesh::ATTRIBUTE_COLOR),
        Some(VertexAttributeValues::Float32x4(dst)) if dst.len() == n
    );
    if !colors_ok {
        return Err(TorusError::InvariantViolation {
            what: "mesh colors (Float32x4)",
            expected: n,
            actual: attribute_len(mesh, Mesh::ATTRIBUTE_COLOR),
        });
    }

    if let Some(VertexAttributeValues::Float32x3(dst)) =
        mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION)
    {
        dst.copy_from_slice(&working.positions);
    }
    if let Some(VertexAttributeValues::Float32x4(dst)) = mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR)
    {
        for (d, c) in dst.iter_mut().zip(&working.colors) {
            *d = [c[0], c[1], c[2], 1.0];
        }
    }
    Ok(())
}

fn attribute_len(mesh: &Mesh, attribute: MeshVertexAttribute) -> usize {
    mesh.attribute(attribute).map_or(0, |values| values.len())
}

fn rgba(colors: &[[f32; 3]]) -> Vec<[f32; 4]> {
    colors.iter().map(|c| [c[0], c[1], c[2], 1.0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> ReferenceGeometry {
        ReferenceGeometry::from_parts(
            vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![[0.0, 0.5, 0.5]; 3],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn from_parts_rejects_mismatched_lengths() {
        let err = ReferenceGeometry::from_parts(
            vec![[0.0; 3]; 3],
            vec![[0.0; 3]; 3],
            vec![[0.0; 3]; 2],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TorusError::InvariantViolation {
                what: "reference colors",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn from_parts_rejects_out_of_range_index() {
        let err = ReferenceGeometry::from_parts(
            vec![[0.0; 3]; 3],
            vec![[0.0; 3]; 3],
            vec![[0.0; 3]; 3],
            vec![0, 1, 3],
        )
        .unwrap_err();
        assert!(matches!(err, TorusError::InvariantViolation { actual: 3, .. }));
    }

    #[test]
    fn working_buffer_starts_at_reference() {
        let reference = triangle();
        let working = WorkingBuffer::from_reference(&reference);
        assert_eq!(working.positions(), reference.positions());
        assert_eq!(working.colors(), reference.colors());
    }

    #[test]
    fn write_to_mesh_updates_in_place() {
        let reference = triangle();
        let mut working = WorkingBuffer::from_reference(&reference);
        let mut mesh = buffer_to_mesh(&reference, &working);

        working.positions[1] = [0.0, 2.0, 0.0];
        working.colors[2] = [0.0, 1.0, 1.0];
        write_to_mesh(&mut mesh, &working).unwrap();

        let Some(VertexAttributeValues::Float32x3(pos)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("positions missing");
        };
        assert_eq!(pos[1], [0.0, 2.0, 0.0]);
        let Some(VertexAttributeValues::Float32x4(col)) = mesh.attribute(Mesh::ATTRIBUTE_COLOR)
        else {
            panic!("colors missing");
        };
        assert_eq!(col[2], [0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn write_to_mesh_keeps_attribute_storage() {
        let reference = triangle();
        let mut working = WorkingBuffer::from_reference(&reference);
        let mut mesh = buffer_to_mesh(&reference, &working);
        let storage = |mesh: &Mesh| {
            let Some(VertexAttributeValues::Float32x3(pos)) =
                mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            else {
                panic!("positions missing");
            };
            let Some(VertexAttributeValues::Float32x4(col)) = mesh.attribute(Mesh::ATTRIBUTE_COLOR)
            else {
                panic!("colors missing");
            };
            (pos.as_ptr(), col.as_ptr())
        };
        let before = storage(&mesh);
        for step in 0..4 {
            working.positions[0] = [step as f32, 0.0, 0.0];
            working.colors[0] = [0.0, step as f32 * 0.25, 1.0];
            write_to_mesh(&mut mesh, &working).unwrap();
        }
        assert_eq!(storage(&mesh), before);
    }

    #[test]
    fn write_to_mesh_rejects_wrong_length() {
        let reference = triangle();
        let working = WorkingBuffer::from_reference(&reference);
        let mut mesh = buffer_to_mesh(&reference, &working);
        let short = WorkingBuffer {
            positions: vec![[9.0; 3]; 2],
            colors: vec![[9.0; 3]; 2],
        };
        let err = write_to_mesh(&mut mesh, &short).unwrap_err();
        assert!(matches!(err, TorusError::InvariantViolation { .. }));

        // Untouched on failure.
        let Some(VertexAttributeValues::Float32x3(pos)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("positions missing");
        };
        assert_eq!(pos.as_slice(), reference.positions());
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let err = validate_segments("radial_segments", 2).unwrap_err();
        assert!(err.to_string().contains("radial_segments"));
        assert!(validate_positive("minor_radius", -1.0).is_err());
        assert!(validate_positive("minor_radius", f64::NAN).is_err());
        assert!(validate_positive("minor_radius", 0.5).is_ok());
    }
}
