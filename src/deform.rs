//! Noise-driven vertex displacement and colour blending.
//!
//! For each reference vertex `v`:
//!  1. `n = noise(v.x, v.y, v.z, time + phase)`, `n ∈ [-1, 1]`.
//!  2. `d = max_displacement · n`.
//!  3. Push `v` along its own radial direction from the origin, scaled by
//!     `1 + d` (see [`DisplacementMode`]).  A vertex at the origin has no
//!     direction and is emitted unchanged.
//!  4. Blend `base_color → peak_color` by `|d| / max_displacement`, clamped
//!     to `[0, 1]`.
//!
//! Every call reads only the immutable reference, so the output for a given
//! `(time, phase)` is the same no matter how many frames came before it.

use rayon::prelude::*;

use crate::{
    buffer::{ReferenceGeometry, TorusError, WorkingBuffer, check_len},
    noise::NoiseField,
};

/// Below this many vertices per rayon task the split overhead dominates.
const MIN_VERTICES_PER_TASK: usize = 512;

/// How the scaled radial direction is turned back into a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DisplacementMode {
    /// `v̂ · |v| · (1 + d)`: the surface breathes around its reference shape
    /// and the relative radial change never exceeds `max_displacement`.
    #[default]
    Radial,
    /// `v̂ · (1 + d)`: every vertex lands on a shell of radius `1 + d`,
    /// collapsing the ring onto a noisy unit sphere.
    UnitShell,
}

/// Parameters shared by every instance in a set.
#[derive(Clone, Debug, PartialEq)]
pub struct DeformParams {
    max_displacement: f32,
    base_color: [f32; 3],
    peak_color: [f32; 3],
    mode: DisplacementMode,
}

impl DeformParams {
    /// Validate and bundle the deformation parameters.
    ///
    /// `max_displacement` must be finite and non-negative; zero freezes the
    /// surface at its reference shape in `base_color`.
    pub fn new(
        max_displacement: f32,
        base_color: [f32; 3],
        peak_color: [f32; 3],
        mode: DisplacementMode,
    ) -> Result<Self, TorusError> {
        if !(max_displacement.is_finite() && max_displacement >= 0.0) {
            return Err(TorusError::InvalidParameter {
                name: "max_displacement",
                value: max_displacement as f64,
                requirement: "must be finite and non-negative",
            });
        }
        for (name, color) in [("base_color", base_color), ("peak_color", peak_color)] {
            if let Some(&bad) = color.iter().find(|c| !c.is_finite()) {
                return Err(TorusError::InvalidParameter {
                    name,
                    value: bad as f64,
                    requirement: "colour channels must be finite",
                });
            }
        }
        Ok(Self {
            max_displacement,
            base_color,
            peak_color,
            mode,
        })
    }

    pub fn max_displacement(&self) -> f32 {
        self.max_displacement
    }

    pub fn base_color(&self) -> [f32; 3] {
        self.base_color
    }

    pub fn peak_color(&self) -> [f32; 3] {
        self.peak_color
    }

    pub fn mode(&self) -> DisplacementMode {
        self.mode
    }

    /// Colour blend factor for a signed displacement.
    #[inline]
    pub fn blend_factor(&self, displacement: f32) -> f32 {
        if self.max_displacement > 0.0 {
            (displacement.abs() / self.max_displacement).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Displace one vertex along its radial direction.
///
/// The length is taken in `f64`: squaring any finite `f32` coordinate there
/// cannot overflow, so every finite non-zero vertex gets a direction.
#[inline]
pub fn displace(v: [f32; 3], displacement: f32, mode: DisplacementMode) -> [f32; 3] {
    let [x, y, z] = v.map(f64::from);
    let len = (x * x + y * y + z * z).sqrt();
    if !(len > 0.0 && len.is_finite()) {
        return v;
    }
    let radius = match mode {
        DisplacementMode::Radial => len * (1.0 + displacement as f64),
        DisplacementMode::UnitShell => 1.0 + displacement as f64,
    };
    let scale = radius / len;
    [(x * scale) as f32, (y * scale) as f32, (z * scale) as f32]
}

/// Deform `reference` at `time + phase` into an existing `out` buffer.
///
/// Lengths are checked before anything is written, so on error `out` still
/// holds whatever it held before the call.
pub fn deform_into<N: NoiseField + ?Sized>(
    noise: &N,
    reference: &ReferenceGeometry,
    time: f64,
    phase: f64,
    params: &DeformParams,
    out: &mut WorkingBuffer,
) -> Result<(), TorusError> {
    let n = reference.len();
    check_len("reference colors", n, reference.colors().len())?;
    check_len("working positions", n, out.positions.len())?;
    check_len("working colors", n, out.colors.len())?;

    let w = time + phase;
    out.positions
        .par_iter_mut()
        .zip(out.colors.par_iter_mut())
        .zip(reference.positions().par_iter())
        .with_min_len(MIN_VERTICES_PER_TASK)
        .for_each(|((pos, color), &v)| {
            let sample = noise.sample(v[0] as f64, v[1] as f64, v[2] as f64, w);
            let displacement = params.max_displacement * sample as f32;
            *pos = displace(v, displacement, params.mode);

            let t = params.blend_factor(displacement);
            *color = [
                lerp(params.base_color[0], params.peak_color[0], t),
                lerp(params.base_color[1], params.peak_color[1], t),
                lerp(params.base_color[2], params.peak_color[2], t),
            ];
        });
    Ok(())
}

/// Allocating form of [`deform_into`].
pub fn deform<N: NoiseField + ?Sized>(
    noise: &N,
    reference: &ReferenceGeometry,
    time: f64,
    phase: f64,
    params: &DeformParams,
) -> Result<WorkingBuffer, TorusError> {
    let mut out = WorkingBuffer::from_reference(reference);
    deform_into(noise, reference, time, phase, params, &mut out)?;
    Ok(out)
}

/// Exact at both endpoints: `t = 0` yields `a`, `t = 1` yields `b`.
#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a * (1.0 - t) + b * t
}
