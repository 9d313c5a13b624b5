//! Seeded 4D coherent noise for vertex displacement.
//!
//! The deformation engine only depends on the [`NoiseField`] contract:
//!   * deterministic for a fixed seed and fixed inputs,
//!   * output in `[-1, 1]`,
//!   * continuous (nearby inputs give nearby outputs),
//!   * no mutable state visible to callers.
//!
//! [`SeededNoise`] adapts any `noise` crate source implementing
//! `NoiseFn<f64, 4>` to that contract.  The fourth coordinate carries the
//! animation time, so a fixed point in space slowly drifts through the field
//! as the clock advances.

use noise::{NoiseFn, OpenSimplex, Seedable};

/// A deterministic scalar field over ℝ⁴.
///
/// Implementations must be `Send + Sync`: the deformation engine samples the
/// same field from several rayon workers at once.
pub trait NoiseField: Send + Sync {
    /// Sample the field at `(x, y, z, w)`.  The result lies in `[-1, 1]`.
    fn sample(&self, x: f64, y: f64, z: f64, w: f64) -> f64;
}

/// Wraps a seeded `noise` crate source and clamps its output to `[-1, 1]`.
///
/// Gradient noise sources can overshoot their nominal range by a small margin
/// at lattice extremes; the clamp keeps the range guarantee exact.
pub struct SeededNoise<N> {
    noise: N,
    seed: u32,
}

/// The field used by [`crate::TorusFieldConfig::build`].
pub type DefaultNoise = SeededNoise<OpenSimplex>;

impl<N: NoiseFn<f64, 4> + Seedable + Default> SeededNoise<N> {
    /// Build a field from an explicit seed.
    pub fn new(seed: u32) -> Self {
        Self {
            noise: N::default().set_seed(seed),
            seed,
        }
    }

    /// Build a field from a process-chosen seed.
    ///
    /// The field is still deterministic for its whole lifetime; the chosen
    /// seed is logged so a run can be reproduced with [`SeededNoise::new`].
    pub fn from_entropy() -> Self {
        let seed = rand::random::<u32>();
        bevy::log::info!("noise field seeded from entropy: seed={seed}");
        Self::new(seed)
    }
}

impl<N> SeededNoise<N> {
    /// The seed this field was built with.
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl<N: NoiseFn<f64, 4> + Send + Sync> NoiseField for SeededNoise<N> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        self.noise.get([x, y, z, w]).clamp(-1.0, 1.0)
    }
}

/// Apply the time wrap policy to a clock value before it reaches the field.
///
/// With `None` the time coordinate grows without bound.  `f64` keeps enough
/// precision for years of animation at typical steps, but the gradient
/// sources lose all fractional lattice position for huge inputs:
/// `OpenSimplex` returns exactly `0` once `w` reaches about `1e15`, which
/// freezes the surface at its reference shape.  Runs meant to last that long
/// should set a period.  With `Some(period)`
/// the coordinate is folded into `[0, period)`, which produces one visible
/// jump per period in exchange for bounded inputs.  Non-positive or
/// non-finite periods are treated as `None`.
#[inline]
pub fn wrap_time(time: f64, period: Option<f64>) -> f64 {
    match period {
        Some(p) if p > 0.0 && p.is_finite() => time.rem_euclid(p),
        _ => time,
    }
}
