//! Mapping of conditioned audio onto fluid physics parameters
//!
//! Every parameter has a fixed `[min, max]` range and a `base` value used
//! whenever no audio is available. The mapper never produces a partial set.

use super::curves::CurveConfig;
use super::pipeline::AudioBands;
use crate::clamp01;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Bounded range of a single physics parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
    /// Value used without audio input
    pub base: f32,
}

impl ParameterRange {
    /// Declare a range
    pub const fn new(min: f32, max: f32, base: f32) -> Self {
        Self { min, max, base }
    }

    /// Linear map of a normalized value into the range
    pub fn map(&self, value: f32) -> f32 {
        self.min + clamp01(value) * (self.max - self.min)
    }

    /// Clamp an already scaled value into the range
    pub fn bound(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.base
        }
    }
}

/// Splat force: how hard new dye/velocity is injected
pub const SPLAT_FORCE: ParameterRange = ParameterRange::new(8.0, 23.0, 5.0);
/// Thermal rate: speed of the buoyancy-driven drift
pub const THERMAL_RATE: ParameterRange = ParameterRange::new(2.0, 8.0, 3.0);
/// Color phase in radians
pub const COLOR_PHASE: ParameterRange = ParameterRange::new(0.0, TAU, 0.0);
/// Overall brightness
pub const INTENSITY: ParameterRange = ParameterRange::new(0.4, 1.0, 0.7);
/// Vorticity confinement strength
pub const CURL_STRENGTH: ParameterRange = ParameterRange::new(15.0, 30.0, 20.0);
/// Apparent fluid thickness
pub const VISCOSITY: ParameterRange = ParameterRange::new(0.3, 0.6, 0.45);

/// Complete set of physics parameters handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParameterSet {
    /// Splat force
    pub splat_force: f32,
    /// Thermal rate
    pub thermal_rate: f32,
    /// Color phase (radians)
    pub color_phase: f32,
    /// Intensity
    pub intensity: f32,
    /// Curl strength
    pub curl_strength: f32,
    /// Viscosity
    pub viscosity: f32,
}

impl PhysicsParameterSet {
    /// The documented base values
    pub const fn base() -> Self {
        Self {
            splat_force: SPLAT_FORCE.base,
            thermal_rate: THERMAL_RATE.base,
            color_phase: COLOR_PHASE.base,
            intensity: INTENSITY.base,
            curl_strength: CURL_STRENGTH.base,
            viscosity: VISCOSITY.base,
        }
    }
}

impl Default for PhysicsParameterSet {
    fn default() -> Self {
        Self::base()
    }
}

/// Stateless mapper from conditioned audio bands to physics parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsMapper {
    curves: CurveConfig,
}

impl PhysicsMapper {
    /// Create a mapper using the given curve parameters
    pub fn new(curves: CurveConfig) -> Self {
        Self { curves }
    }

    /// Curve parameters in use
    pub fn curves(&self) -> &CurveConfig {
        &self.curves
    }

    /// Map smoothed bands and the current beat burst onto a parameter set.
    ///
    /// `None` yields the base set.
    pub fn calculate_physics_params(
        &self,
        bands: Option<&AudioBands>,
        burst: f32,
    ) -> PhysicsParameterSet {
        let Some(bands) = bands else {
            return PhysicsParameterSet::base();
        };
        let bands = bands.sanitized();
        let burst = if burst.is_finite() { burst.max(1.0) } else { 1.0 };

        let bass = self.curves.power(bands.bass);
        let mids = self.curves.soft_knee(bands.mids);
        let treble = self.curves.sigmoid(bands.treble);

        PhysicsParameterSet {
            splat_force: SPLAT_FORCE.bound(SPLAT_FORCE.map(bass) * burst),
            thermal_rate: THERMAL_RATE.map(mids),
            color_phase: COLOR_PHASE.map(treble),
            intensity: INTENSITY.map(bands.volume),
            curl_strength: CURL_STRENGTH.map(mids),
            viscosity: VISCOSITY.map(1.0 - bands.bass),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ParameterRange; 6] = [
        SPLAT_FORCE,
        THERMAL_RATE,
        COLOR_PHASE,
        INTENSITY,
        CURL_STRENGTH,
        VISCOSITY,
    ];

    #[test]
    fn test_map_endpoints() {
        for range in ALL {
            assert_eq!(range.map(0.0), range.min);
            assert!((range.map(1.0) - range.max).abs() < 1e-5);
            assert_eq!(range.map(-1.0), range.min);
            assert!((range.map(7.0) - range.max).abs() < 1e-5);
        }
    }

    #[test]
    fn test_no_audio_gives_base_values() {
        let params = PhysicsMapper::default().calculate_physics_params(None, 1.5);
        assert_eq!(params.splat_force, 5.0);
        assert_eq!(params.thermal_rate, 3.0);
        assert_eq!(params.color_phase, 0.0);
        assert_eq!(params.intensity, 0.7);
        assert_eq!(params.curl_strength, 20.0);
        assert_eq!(params.viscosity, 0.45);
        assert_eq!(params, PhysicsParameterSet::default());
    }

    #[test]
    fn test_bass_drives_splat_and_thins_viscosity() {
        let mapper = PhysicsMapper::default();
        let quiet = AudioBands::new(0.1, 0.5, 0.5, 0.5);
        let loud = AudioBands::new(0.9, 0.5, 0.5, 0.5);
        let quiet = mapper.calculate_physics_params(Some(&quiet), 1.0);
        let loud = mapper.calculate_physics_params(Some(&loud), 1.0);
        assert!(loud.splat_force > quiet.splat_force);
        assert!(loud.viscosity < quiet.viscosity);
    }

    #[test]
    fn test_burst_is_bounded() {
        let mapper = PhysicsMapper::default();
        let bands = AudioBands::new(0.4, 0.2, 0.2, 0.2);
        let calm = mapper.calculate_physics_params(Some(&bands), 1.0);
        let burst = mapper.calculate_physics_params(Some(&bands), 1.5);
        assert!(burst.splat_force > calm.splat_force);

        let peak = mapper.calculate_physics_params(Some(&AudioBands::new(1.0, 1.0, 1.0, 1.0)), 1.5);
        assert_eq!(peak.splat_force, SPLAT_FORCE.max);
    }

    #[test]
    fn test_every_parameter_in_range() {
        let mapper = PhysicsMapper::default();
        for i in 0..=20 {
            let x = i as f32 / 20.0;
            let p = mapper.calculate_physics_params(Some(&AudioBands::new(x, x, 1.0 - x, x)), 1.5);
            let pairs = [
                (p.splat_force, SPLAT_FORCE),
                (p.thermal_rate, THERMAL_RATE),
                (p.color_phase, COLOR_PHASE),
                (p.intensity, INTENSITY),
                (p.curl_strength, CURL_STRENGTH),
                (p.viscosity, VISCOSITY),
            ];
            for (value, range) in pairs {
                assert!(value >= range.min && value <= range.max + 1e-5);
            }
        }
    }
}
