//! LiquidLight Core - Audio-Reactive Control Core
//!
//! This crate contains the real-time control logic behind the liquid light
//! visuals, including:
//! - Audio conditioning (EMA smoothing, response curves)
//! - Beat and tempo detection, beat-gated bursts
//! - Mapping of audio channels onto bounded fluid physics parameters
//! - Frame profiling, adaptive quality, tier hysteresis and throttling detection
//! - Engine configuration and logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod config;
pub mod logging;
pub mod perf;
pub mod scheduler;

// --- Re-exports grouped by category ---

// Audio
pub use audio::{
    AudioBands, AudioFrame, AudioFrameOutput, AudioReactiveConfig, AudioReactivePipeline,
    BeatDetector, BeatDetectorConfig, BeatEvent, BeatGate, BeatGateConfig, CurveConfig,
    EnergySample, EnergySmoother, ParameterRange, PhysicsMapper, PhysicsParameterSet,
};

// Performance
pub use perf::{
    AdaptiveQualityConfig, AdaptiveQualityManager, AlertKind, AlertSeverity, AlertThresholds,
    BatteryStatus, ControlDecision, DeviceCapabilities, DeviceProfile, FrameMetrics,
    MetricSummary, PerformanceAlert, PerformanceConfig, PerformanceController,
    PerformanceProfile, PerformanceProfiler, PerformanceSample, ProfilerConfig,
    QualityAdjustment, QualitySettings, TextureQuality, ThermalConfig, ThermalStatus,
    ThermalThrottlingDetector, ThrottlingLevel, Tier, TierLimits, TierTransitionConfig,
    TierTransitionManager,
};

// Config, logging & scheduling
pub use config::{EngineConfig, ResourcePoolConfig};
pub use logging::LogConfig;
pub use scheduler::PeriodicTask;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value is outside its valid domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem error while reading or writing configuration/logs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Clamp a value to `[0, 1]`, mapping non-finite input to `0`.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(3.0), 1.0);
        assert_eq!(clamp01(f32::NAN), 0.0);
        assert_eq!(clamp01(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidConfig("alpha out of range".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: alpha out of range");
    }
}
