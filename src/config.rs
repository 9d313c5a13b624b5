//! Serializable configuration for a whole torus field.

use crate::{
    buffer::{TorusError, validate_positive},
    deform::{DeformParams, DisplacementMode},
    instance::{DEFAULT_TIME_STEP, InstanceMaterial, InstanceSet, PhasePolicy},
    noise::DefaultNoise,
    systems::ClockMode,
    torus::TorusShape,
};

/// Every option recognised by the deformation core.
///
/// Missing fields fall back to [`Default`], which reproduces three
/// teal-to-aqua tori of radius 8 / 2 breathing by up to 25 %.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TorusFieldConfig {
    /// Noise seed.  `None` picks one at startup and logs it.
    pub seed: Option<u32>,
    #[serde(flatten)]
    pub shape: TorusShape,
    pub instance_count: usize,
    /// Largest relative radial displacement, e.g. `0.25` for ±25 %.
    pub max_displacement: f32,
    /// Colour at zero displacement, linear RGB \[0, 1\].
    pub base_color: [f32; 3],
    /// Colour at full displacement, linear RGB \[0, 1\].
    pub peak_color: [f32; 3],
    /// Clock increment per tick in [`ClockMode::FixedStep`].
    pub time_step: f64,
    pub phase: PhasePolicy,
    /// Optional period the noise time coordinate is folded into.
    pub time_wrap: Option<f64>,
    pub displacement: DisplacementMode,
    pub material: InstanceMaterial,
    pub clock: ClockMode,
}

impl Default for TorusFieldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            shape: TorusShape::default(),
            instance_count: 3,
            max_displacement: 0.25,
            // CSS "teal" and "aqua" converted to linear RGB.
            base_color: [0.0, 0.2159, 0.2159],
            peak_color: [0.0, 1.0, 1.0],
            time_step: DEFAULT_TIME_STEP,
            phase: PhasePolicy::Index,
            time_wrap: None,
            displacement: DisplacementMode::Radial,
            material: InstanceMaterial::default(),
            clock: ClockMode::FixedStep,
        }
    }
}

impl TorusFieldConfig {
    /// Check every option without building any geometry.
    pub fn validate(&self) -> Result<(), TorusError> {
        self.shape.validate()?;
        self.deform_params()?;
        validate_positive("time_step", self.time_step)?;
        if self.instance_count == 0 {
            return Err(TorusError::InvalidParameter {
                name: "instance_count",
                value: 0.0,
                requirement: "must be at least 1",
            });
        }
        if let Some(period) = self.time_wrap {
            validate_positive("time_wrap", period)?;
        }
        if let ClockMode::Elapsed { scale } = self.clock {
            validate_positive("clock.scale", scale)?;
        }
        Ok(())
    }

    pub fn deform_params(&self) -> Result<DeformParams, TorusError> {
        DeformParams::new(
            self.max_displacement,
            self.base_color,
            self.peak_color,
            self.displacement,
        )
    }

    /// Build the instance set this configuration describes.
    pub fn build(&self) -> Result<InstanceSet, TorusError> {
        self.validate()?;
        let noise = match self.seed {
            Some(seed) => DefaultNoise::new(seed),
            None => DefaultNoise::from_entropy(),
        };
        let set = InstanceSet::new(
            Box::new(noise),
            &self.shape,
            self.instance_count,
            self.deform_params()?,
        )?
        .with_phase_policy(self.phase)
        .with_material(self.material)
        .with_time_wrap(self.time_wrap)
        .with_time_step(self.time_step)?;
        bevy::log::debug!(
            "built torus field: {} instances × {} vertices",
            set.len(),
            self.shape.vertex_count()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_reference_scene() {
        let config = TorusFieldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shape.vertex_count(), 40 * 150);
        assert_eq!(config.instance_count, 3);
        assert_eq!(config.time_step, 0.015);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TorusFieldConfig =
            serde_json::from_str(r#"{ "seed": 42, "radial_segments": 12, "instance_count": 2 }"#)
                .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.shape.radial_segments, 12);
        assert_eq!(config.shape.tubular_segments, 150);
        assert_eq!(config.instance_count, 2);
        assert_eq!(config.max_displacement, 0.25);
    }

    #[test]
    fn json_round_trip_preserves_policies() {
        let config = TorusFieldConfig {
            phase: PhasePolicy::Hashed { seed: 9 },
            clock: ClockMode::Elapsed { scale: 1.5 },
            displacement: DisplacementMode::UnitShell,
            time_wrap: Some(600.0),
            ..TorusFieldConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TorusFieldConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let cases = [
            TorusFieldConfig {
                instance_count: 0,
                ..Default::default()
            },
            TorusFieldConfig {
                time_step: -0.01,
                ..Default::default()
            },
            TorusFieldConfig {
                max_displacement: -1.0,
                ..Default::default()
            },
            TorusFieldConfig {
                time_wrap: Some(0.0),
                ..Default::default()
            },
            TorusFieldConfig {
                clock: ClockMode::Elapsed { scale: f64::NAN },
                ..Default::default()
            },
            TorusFieldConfig {
                shape: TorusShape {
                    tubular_segments: 2,
                    ..TorusShape::default()
                },
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.build().is_err(), "accepted {config:?}");
        }
    }

    #[test]
    fn build_applies_every_option() {
        let config = TorusFieldConfig {
            seed: Some(42),
            shape: TorusShape {
                radial_segments: 6,
                tubular_segments: 10,
                ..TorusShape::default()
            },
            instance_count: 4,
            time_step: 0.5,
            phase: PhasePolicy::Hashed { seed: 3 },
            material: InstanceMaterial {
                roughness: 0.2,
                metallic: 0.1,
            },
            ..Default::default()
        };
        let mut set = config.build().unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.working(0).map(|w| w.len()), Some(60));
        assert_eq!(
            set.instance(3).map(|i| i.phase()),
            Some(PhasePolicy::Hashed { seed: 3 }.phase(3))
        );
        assert!(set.instances().iter().all(|i| i.material() == config.material));
        set.tick();
        assert_eq!(set.time(), 0.5);
    }

    #[test]
    fn same_seed_builds_identical_fields() {
        let config = TorusFieldConfig {
            seed: Some(42),
            ..Default::default()
        };
        let mut a = config.build().unwrap();
        let mut b = config.build().unwrap();
        a.tick();
        b.tick();
        for k in 0..a.len() {
            assert_eq!(a.working(k), b.working(k));
        }
    }
}
