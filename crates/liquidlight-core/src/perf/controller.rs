//! Per-frame orchestration of the performance components

use super::adaptive_quality::{AdaptiveQualityConfig, AdaptiveQualityManager};
use super::device::DeviceProfile;
use super::profiler::{FrameMetrics, PerformanceAlert, PerformanceProfiler, ProfilerConfig};
use super::quality::{QualitySettings, Tier};
use super::thermal::{BatteryStatus, ThermalConfig, ThermalStatus, ThermalThrottlingDetector};
use super::tier_transition::{TierTransitionConfig, TierTransitionManager};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration of every performance component
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Profiler
    pub profiler: ProfilerConfig,
    /// Fine-grained quality adaptation
    pub quality: AdaptiveQualityConfig,
    /// Tier transitions
    pub tiers: TierTransitionConfig,
    /// Thermal detection
    pub thermal: ThermalConfig,
}

impl PerformanceConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.tiers.validate()?;
        self.thermal.validate()
    }
}

/// What changed during one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlDecision {
    /// Alerts raised by the frame
    pub alerts: Vec<PerformanceAlert>,
    /// New quality settings, if they changed
    pub quality: Option<QualitySettings>,
    /// New tier, if it changed
    pub tier: Option<Tier>,
}

impl ControlDecision {
    /// Whether the renderer has to react
    pub fn has_changes(&self) -> bool {
        self.quality.is_some() || self.tier.is_some()
    }
}

/// Owns the profiler, quality manager, tier manager and thermal detector
/// and feeds them the same frame sample.
#[derive(Debug, Clone)]
pub struct PerformanceController {
    profile: DeviceProfile,
    tier: Tier,
    profiler: PerformanceProfiler,
    quality: AdaptiveQualityManager,
    tiers: TierTransitionManager,
    thermal: ThermalThrottlingDetector,
}

impl PerformanceController {
    /// Build the components for a device
    pub fn new(profile: DeviceProfile, config: PerformanceConfig) -> Self {
        Self {
            tier: profile.recommended_tier,
            profiler: PerformanceProfiler::new(config.profiler),
            quality: AdaptiveQualityManager::new(profile, config.quality),
            tiers: TierTransitionManager::new(config.tiers),
            thermal: ThermalThrottlingDetector::new(config.thermal),
            profile,
        }
    }

    /// Begin profiling and thermal monitoring
    pub fn start(&mut self, now: f64) {
        self.profiler.start_profiling(now);
        self.thermal.start_monitoring(now);
        info!(
            "Performance control started at tier {} (max {})",
            self.tier, self.profile.max_tier
        );
    }

    /// Stop profiling and thermal monitoring
    pub fn stop(&mut self) {
        self.profiler.stop_profiling();
        self.thermal.stop_monitoring();
    }

    /// Record one frame and let every component react to it
    pub fn on_frame(&mut self, metrics: FrameMetrics, now: f64) -> ControlDecision {
        if !self.profiler.is_profiling() {
            return ControlDecision::default();
        }

        let alerts = self.profiler.record_frame(metrics, now);
        let Some(sample) = self.profiler.latest_sample().copied() else {
            return ControlDecision {
                alerts,
                ..Default::default()
            };
        };

        let mut decision = ControlDecision {
            alerts,
            ..Default::default()
        };

        if self
            .quality
            .update_performance(sample.fps, sample.frame_time, sample.memory_usage, now)
            .is_some()
        {
            decision.quality = Some(*self.quality.settings());
        }

        if let Some(next) =
            self.tiers
                .check_and_transition(sample.fps, self.tier, self.profile.max_tier, now)
        {
            self.tier = next;
            self.quality.set_tier(next);
            decision.tier = Some(next);
            decision.quality = Some(*self.quality.settings());
        }

        self.thermal.record_sample(sample.fps, sample.frame_time);
        decision
    }

    /// Periodic work: the interval-gated thermal check
    pub fn on_interval(&mut self, now: f64) -> Option<ThermalStatus> {
        self.thermal.tick(now)
    }

    /// Host battery state for thermal recommendations
    pub fn set_battery_status(&mut self, battery: Option<BatteryStatus>) {
        self.thermal.set_battery_status(battery);
    }

    /// Current tier
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Copy of the current settings
    pub fn quality_settings(&self) -> QualitySettings {
        *self.quality.settings()
    }

    /// Copy of the last thermal status
    pub fn thermal_status(&self) -> ThermalStatus {
        self.thermal.status().clone()
    }

    /// Device profile in use
    pub fn device_profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Profiler, for summaries and alert export
    pub fn profiler(&self) -> &PerformanceProfiler {
        &self.profiler
    }

    /// Mutable profiler access
    pub fn profiler_mut(&mut self) -> &mut PerformanceProfiler {
        &mut self.profiler
    }

    /// Return every component to its initial state (profiling stays as is)
    pub fn reset(&mut self) {
        self.tier = self.profile.recommended_tier;
        self.quality.reset_to_recommended();
        self.tiers.reset();
        self.thermal.reset();
    }
}
