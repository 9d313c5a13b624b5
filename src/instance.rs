//! A set of torus instances animated by one shared clock and noise field.
//!
//! Each instance owns its reference geometry, its working buffer and its
//! material.  [`InstanceSet::advance`] moves the clock forward and re-deforms
//! every instance in place; the working buffers are readable as soon as it
//! returns.

use bevy::prelude::Resource;

use crate::{
    buffer::{ReferenceGeometry, TorusError, WorkingBuffer, validate_positive},
    deform::{DeformParams, deform_into},
    noise::{NoiseField, wrap_time},
    torus::TorusShape,
};

/// Per-tick clock increment used by [`InstanceSet::tick`] unless overridden.
pub const DEFAULT_TIME_STEP: f64 = 0.015;

/// Width of the window hashed phases are spread over.
const HASHED_PHASE_SPAN: f64 = 1024.0;

/// Monotonic animation time, starting at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationClock {
    time: f64,
    wrap: Option<f64>,
}

impl AnimationClock {
    /// Move forward by `dt`.  Negative or non-finite steps are refused and
    /// leave the clock untouched; returns whether the step was applied.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !(dt.is_finite() && dt >= 0.0) {
            return false;
        }
        self.time += dt;
        true
    }

    /// Total accumulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time coordinate fed to the noise field, after the wrap policy.
    pub fn noise_time(&self) -> f64 {
        wrap_time(self.time, self.wrap)
    }
}

/// How each instance's phase offset is derived from its index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PhasePolicy {
    /// `phase(k) = k`.  Enough to decorrelate a handful of instances.
    #[default]
    Index,
    /// `phase(k)` is a hash of `(seed, k)` spread over `[0, 1024)`.
    Hashed { seed: u64 },
}

impl PhasePolicy {
    pub fn phase(&self, index: usize) -> f64 {
        match *self {
            PhasePolicy::Index => index as f64,
            PhasePolicy::Hashed { seed } => {
                let h = splitmix64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                // Top 53 bits → [0, 1).
                (h >> 11) as f64 / (1u64 << 53) as f64 * HASHED_PHASE_SPAN
            }
        }
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Shading parameters handed to the render host with each instance.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstanceMaterial {
    /// Perceptual roughness in `[0, 1]`.
    pub roughness: f32,
    /// Metallic factor in `[0, 1]`.
    pub metallic: f32,
}

impl Default for InstanceMaterial {
    fn default() -> Self {
        Self {
            roughness: 1.0,
            metallic: 0.5,
        }
    }
}

/// One independently animated copy of the base torus.
#[derive(Clone, Debug)]
pub struct TorusInstance {
    reference: ReferenceGeometry,
    working: WorkingBuffer,
    material: InstanceMaterial,
    phase: f64,
}

impl TorusInstance {
    pub fn reference(&self) -> &ReferenceGeometry {
        &self.reference
    }

    pub fn working(&self) -> &WorkingBuffer {
        &self.working
    }

    pub fn material(&self) -> InstanceMaterial {
        self.material
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

/// All animated instances plus the clock and noise field they share.
#[derive(Resource)]
pub struct InstanceSet {
    noise: Box<dyn NoiseField>,
    instances: Vec<TorusInstance>,
    params: DeformParams,
    clock: AnimationClock,
    time_step: f64,
    frame: u64,
    last_skipped: usize,
}

impl InstanceSet {
    /// Build `count` instances of `shape`, each with its own reference copy
    /// and a working buffer starting at the undisplaced reference.
    ///
    /// Uses [`PhasePolicy::Index`], the default material, no time wrap and
    /// [`DEFAULT_TIME_STEP`]; adjust with the `with_*` methods.
    pub fn new(
        noise: Box<dyn NoiseField>,
        shape: &TorusShape,
        count: usize,
        params: DeformParams,
    ) -> Result<Self, TorusError> {
        if count == 0 {
            return Err(TorusError::InvalidParameter {
                name: "instance_count",
                value: 0.0,
                requirement: "must be at least 1",
            });
        }
        let instances = (0..count)
            .map(|k| {
                let reference = shape.build(params.base_color())?;
                let working = WorkingBuffer::from_reference(&reference);
                Ok(TorusInstance {
                    reference,
                    working,
                    material: InstanceMaterial::default(),
                    phase: PhasePolicy::Index.phase(k),
                })
            })
            .collect::<Result<Vec<_>, TorusError>>()?;
        Ok(Self {
            noise,
            instances,
            params,
            clock: AnimationClock::default(),
            time_step: DEFAULT_TIME_STEP,
            frame: 0,
            last_skipped: 0,
        })
    }

    /// Re-derive every instance's phase from `policy`.
    pub fn with_phase_policy(mut self, policy: PhasePolicy) -> Self {
        for (k, instance) in self.instances.iter_mut().enumerate() {
            instance.phase = policy.phase(k);
        }
        self
    }

    /// Give every instance the same material.
    pub fn with_material(mut self, material: InstanceMaterial) -> Self {
        for instance in &mut self.instances {
            instance.material = material;
        }
        self
    }

    /// Set the increment used by [`InstanceSet::tick`].
    pub fn with_time_step(mut self, time_step: f64) -> Result<Self, TorusError> {
        validate_positive("time_step", time_step)?;
        self.time_step = time_step;
        Ok(self)
    }

    /// Fold the noise time coordinate into `[0, period)`.
    pub fn with_time_wrap(mut self, period: Option<f64>) -> Self {
        self.clock.wrap = period;
        self
    }

    /// Advance the clock by `dt` and re-deform every instance in place.
    ///
    /// An instance whose deformation fails is logged and skipped; its
    /// previous frame stays visible and the other instances still update.
    /// A negative or non-finite `dt` is refused and nothing changes.
    pub fn advance(&mut self, dt: f64) {
        if !self.clock.advance(dt) {
            bevy::log::warn!("ignoring invalid animation step dt={dt}");
            return;
        }
        let time = self.clock.noise_time();
        let noise = &*self.noise;
        let mut skipped = 0;
        for (k, instance) in self.instances.iter_mut().enumerate() {
            if let Err(e) = deform_into(
                noise,
                &instance.reference,
                time,
                instance.phase,
                &self.params,
                &mut instance.working,
            ) {
                bevy::log::error!("torus instance {k} skipped this frame: {e}");
                skipped += 1;
            }
        }
        self.last_skipped = skipped;
        self.frame += 1;
    }

    /// Advance by the fixed time step.
    pub fn tick(&mut self) {
        self.advance(self.time_step);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[TorusInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&TorusInstance> {
        self.instances.get(index)
    }

    pub fn working(&self, index: usize) -> Option<&WorkingBuffer> {
        self.instances.get(index).map(|i| &i.working)
    }

    pub fn params(&self) -> &DeformParams {
        &self.params
    }

    /// Current clock value (before wrapping).
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Number of successful [`InstanceSet::advance`] calls.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Instances skipped during the most recent advance.
    pub fn last_skipped(&self) -> usize {
        self.last_skipped
    }
}
