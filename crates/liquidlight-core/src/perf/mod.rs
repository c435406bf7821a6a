//! Performance control
//!
//! Frame profiling, score-driven quality adaptation, tier hysteresis and
//! thermal throttling detection, tied together by [`PerformanceController`].

pub mod adaptive_quality;
pub mod controller;
pub mod device;
pub mod profiler;
pub mod quality;
pub mod thermal;
pub mod tier_transition;

pub use adaptive_quality::{AdaptiveQualityConfig, AdaptiveQualityManager, QualityAdjustment};
pub use controller::{ControlDecision, PerformanceConfig, PerformanceController};
pub use device::{DeviceCapabilities, DeviceProfile};
pub use profiler::{
    AlertKind, AlertSeverity, AlertThresholds, FrameMetrics, MetricSummary, PerformanceAlert,
    PerformanceProfile, PerformanceProfiler, PerformanceSample, ProfilerConfig,
};
pub use quality::{QualitySettings, TextureQuality, Tier, TierLimits};
pub use thermal::{
    BatteryStatus, ThermalConfig, ThermalStatus, ThermalThrottlingDetector, ThrottlingLevel,
};
pub use tier_transition::{TierTransitionConfig, TierTransitionManager};
