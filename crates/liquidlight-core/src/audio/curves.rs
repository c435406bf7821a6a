//! Response curves applied to normalized audio levels.
//!
//! All curves clamp their input to `[0, 1]` first and return a value in `[0, 1]`.

use crate::{clamp01, CoreError, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the shaping curves used by the physics mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Center of the soft knee
    pub knee_center: f32,
    /// Width of the soft knee
    pub knee_width: f32,
    /// Exponent of the power curve (> 1 expands)
    pub power_exponent: f32,
    /// Steepness of the sigmoid S-curve
    pub sigmoid_steepness: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            knee_center: 0.5,
            knee_width: 0.2,
            power_exponent: 1.3,
            sigmoid_steepness: 4.5,
        }
    }
}

/// Soft-knee compressor.
///
/// Linear below `center - width/2`, 2:1 compression above `center + width/2`
/// and a smoothstep blend of the two inside the knee.
pub fn soft_knee(x: f32, center: f32, width: f32) -> f32 {
    let x = clamp01(x);
    let half = (width.max(0.0)) * 0.5;
    let lower = center - half;
    let upper = center + half;

    let compressed = |v: f32| upper + (v - upper) * 0.5;

    let y = if x <= lower {
        x
    } else if x >= upper {
        compressed(x)
    } else {
        let t = (x - lower) / (upper - lower);
        let blend = t * t * (3.0 - 2.0 * t);
        x + (compressed(x) - x) * blend
    };

    clamp01(y)
}

/// Power curve `x^exponent`
pub fn power_curve(x: f32, exponent: f32) -> f32 {
    clamp01(x).powf(exponent.max(f32::EPSILON))
}

/// Logistic S-curve centered on 0.5
pub fn sigmoid(x: f32, steepness: f32) -> f32 {
    let x = clamp01(x);
    1.0 / (1.0 + (-steepness * (x - 0.5)).exp())
}

impl CurveConfig {
    /// The knee must sit inside `[0, 1]` and both curve shapes must be positive
    pub fn validate(&self) -> Result<()> {
        let half = self.knee_width * 0.5;
        let knee_fits = self.knee_width.is_finite()
            && self.knee_width >= 0.0
            && self.knee_center - half >= 0.0
            && self.knee_center + half <= 1.0;
        if !knee_fits {
            return Err(CoreError::InvalidConfig(format!(
                "soft knee {} +/- {} must lie within [0, 1]",
                self.knee_center, half
            )));
        }
        if !(self.power_exponent.is_finite() && self.power_exponent > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "power_exponent must be positive, got {}",
                self.power_exponent
            )));
        }
        if !(self.sigmoid_steepness.is_finite() && self.sigmoid_steepness > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "sigmoid_steepness must be positive, got {}",
                self.sigmoid_steepness
            )));
        }
        Ok(())
    }

    /// Soft-knee with this config's knee
    pub fn soft_knee(&self, x: f32) -> f32 {
        soft_knee(x, self.knee_center, self.knee_width)
    }

    /// Power curve with this config's exponent
    pub fn power(&self, x: f32) -> f32 {
        power_curve(x, self.power_exponent)
    }

    /// Sigmoid with this config's steepness
    pub fn sigmoid(&self, x: f32) -> f32 {
        sigmoid(x, self.sigmoid_steepness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_knee_linear_region() {
        assert_eq!(soft_knee(0.2, 0.5, 0.2), 0.2);
        assert_eq!(soft_knee(0.35, 0.5, 0.2), 0.35);
    }

    #[test]
    fn test_soft_knee_compressed_region() {
        // upper knee = 0.6, 1.0 -> 0.6 + 0.4 / 2
        assert!((soft_knee(1.0, 0.5, 0.2) - 0.8).abs() < 1e-6);
        assert!((soft_knee(0.6, 0.5, 0.2) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_soft_knee_is_monotonic() {
        let mut last = soft_knee(0.0, 0.5, 0.2);
        for i in 1..=100 {
            let y = soft_knee(i as f32 / 100.0, 0.5, 0.2);
            assert!(y >= last - 1e-6, "not monotonic at {}", i);
            last = y;
        }
    }

    #[test]
    fn test_knee_must_fit_unit_range() {
        assert!(CurveConfig::default().validate().is_ok());
        let edge = CurveConfig {
            knee_center: 0.75,
            knee_width: 0.5,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());

        for (center, width) in [(0.95, 0.2), (0.05, 0.2), (0.5, -0.1), (0.5, f32::NAN)] {
            let config = CurveConfig {
                knee_center: center,
                knee_width: width,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} / {} accepted", center, width);
        }
    }

    #[test]
    fn test_curve_shapes_must_be_positive() {
        let flat = CurveConfig {
            power_exponent: 0.0,
            ..Default::default()
        };
        assert!(flat.validate().is_err());
        let inverted = CurveConfig {
            sigmoid_steepness: -1.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_power_curve() {
        assert_eq!(power_curve(0.0, 1.3), 0.0);
        assert_eq!(power_curve(1.0, 1.3), 1.0);
        assert!(power_curve(0.5, 1.3) < 0.5);
        assert_eq!(power_curve(2.0, 1.3), 1.0);
    }

    #[test]
    fn test_sigmoid_center() {
        assert!((sigmoid(0.5, 4.5) - 0.5).abs() < 1e-6);
        assert!(sigmoid(0.0, 4.5) < 0.5);
        assert!(sigmoid(1.0, 4.5) > 0.5);
    }

    #[test]
    fn test_curves_stay_in_unit_range() {
        let config = CurveConfig::default();
        for i in -10..=110 {
            let x = i as f32 / 100.0;
            for y in [config.soft_knee(x), config.power(x), config.sigmoid(x)] {
                assert!((0.0..=1.0).contains(&y), "x={} y={}", x, y);
            }
        }
    }
}
