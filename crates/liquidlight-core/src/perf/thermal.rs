//! Thermal throttling detection from sustained frame-rate degradation
//!
//! No temperature sensor is read. A device is considered throttled when the
//! recent frame rate has fallen well below an earlier baseline, or frame
//! times have grown by more than a few milliseconds.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Configuration for [`ThermalThrottlingDetector`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Samples kept for fps and frame time
    pub history_size: usize,
    /// Interval between periodic checks (ms)
    pub check_interval_ms: f64,
    /// Size of the recent window
    pub consecutive_frames_threshold: usize,
    /// fps drop that counts as throttling
    pub fps_drop_threshold: f32,
    /// Frame time increase (ms) that counts as throttling
    pub frame_time_increase_threshold: f32,
    /// Baseline samples required before any verdict
    pub min_baseline_samples: usize,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            history_size: 60,
            check_interval_ms: 1000.0,
            consecutive_frames_threshold: 30,
            fps_drop_threshold: 10.0,
            frame_time_increase_threshold: 5.0,
            min_baseline_samples: 10,
        }
    }
}

impl ThermalConfig {
    /// Check that the windows fit inside the history
    pub fn validate(&self) -> Result<()> {
        if self.consecutive_frames_threshold == 0
            || self.consecutive_frames_threshold + self.min_baseline_samples > self.history_size
        {
            return Err(CoreError::InvalidConfig(format!(
                "thermal windows ({} recent + {} baseline) do not fit in history_size {}",
                self.consecutive_frames_threshold, self.min_baseline_samples, self.history_size
            )));
        }
        if self.check_interval_ms <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "check_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Degree of throttling, ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThrottlingLevel {
    /// No measurable fps drop
    #[default]
    None,
    /// fps dropped by at least 10
    Light,
    /// fps dropped by at least 20
    Moderate,
    /// fps dropped by at least 30
    Severe,
}

impl ThrottlingLevel {
    fn from_fps_drop(drop: f32) -> Self {
        if drop >= 30.0 {
            ThrottlingLevel::Severe
        } else if drop >= 20.0 {
            ThrottlingLevel::Moderate
        } else if drop >= 10.0 {
            ThrottlingLevel::Light
        } else {
            ThrottlingLevel::None
        }
    }
}

/// Battery state reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level (0.0 - 1.0)
    pub level: f32,
    /// Connected to power
    pub charging: bool,
}

/// Battery level under which running unplugged earns a recommendation
pub const LOW_BATTERY_LEVEL: f32 = 0.2;

/// Result of a throttling check
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalStatus {
    /// Whether throttling was detected
    pub is_throttled: bool,
    /// Severity
    pub throttling_level: ThrottlingLevel,
    /// Estimated loss of performance (0.0 - 1.0)
    pub performance_impact: f32,
    /// Ordered advice for the user
    pub recommendations: Vec<String>,
}

/// Watches fps and frame time for sustained degradation
#[derive(Debug, Clone)]
pub struct ThermalThrottlingDetector {
    config: ThermalConfig,
    fps_history: VecDeque<f32>,
    frame_time_history: VecDeque<f32>,
    monitoring: bool,
    last_check: Option<f64>,
    status: ThermalStatus,
    battery: Option<BatteryStatus>,
}

impl Default for ThermalThrottlingDetector {
    fn default() -> Self {
        Self::new(ThermalConfig::default())
    }
}

impl ThermalThrottlingDetector {
    /// Create an idle detector
    pub fn new(config: ThermalConfig) -> Self {
        Self {
            fps_history: VecDeque::with_capacity(config.history_size),
            frame_time_history: VecDeque::with_capacity(config.history_size),
            config,
            monitoring: false,
            last_check: None,
            status: ThermalStatus::default(),
            battery: None,
        }
    }

    /// Start interval-gated checks; the first fires one interval after `now`
    pub fn start_monitoring(&mut self, now: f64) {
        self.monitoring = true;
        self.last_check = Some(now);
        debug!("Thermal monitoring started");
    }

    /// Stop interval-gated checks
    pub fn stop_monitoring(&mut self) {
        self.monitoring = false;
        debug!("Thermal monitoring stopped");
    }

    /// Whether [`Self::tick`] runs checks
    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Append one frame measurement. Non-finite values are dropped.
    pub fn record_sample(&mut self, fps: f32, frame_time: f32) {
        if !fps.is_finite() || !frame_time.is_finite() {
            return;
        }
        let capacity = self.config.history_size.max(1);
        if self.fps_history.len() >= capacity {
            self.fps_history.pop_front();
            self.frame_time_history.pop_front();
        }
        self.fps_history.push_back(fps.max(0.0));
        self.frame_time_history.push_back(frame_time.max(0.0));
    }

    /// Update the host battery state
    pub fn set_battery_status(&mut self, battery: Option<BatteryStatus>) {
        self.battery = battery;
    }

    /// Last computed status
    pub fn status(&self) -> &ThermalStatus {
        &self.status
    }

    /// Run a check if monitoring and the interval has elapsed
    pub fn tick(&mut self, now: f64) -> Option<ThermalStatus> {
        if !self.monitoring {
            return None;
        }
        let due = self
            .last_check
            .map_or(true, |last| now - last >= self.config.check_interval_ms);
        if !due {
            return None;
        }
        self.last_check = Some(now);
        Some(self.evaluate())
    }

    /// Run a check now
    pub fn evaluate(&mut self) -> ThermalStatus {
        let status = self.compute();
        if status.throttling_level != self.status.throttling_level
            || status.is_throttled != self.status.is_throttled
        {
            if status.is_throttled {
                warn!(
                    "Thermal throttling detected: level={:?} impact={:.0}%",
                    status.throttling_level,
                    status.performance_impact * 100.0
                );
            } else {
                info!("Thermal throttling cleared");
            }
        }
        self.status = status.clone();
        status
    }

    fn compute(&self) -> ThermalStatus {
        let n = self.fps_history.len();
        let window = self.config.consecutive_frames_threshold.min(n);
        let baseline_len = n - window;
        if window == 0 || baseline_len < self.config.min_baseline_samples.max(1) {
            return ThermalStatus {
                recommendations: recommendations(ThrottlingLevel::None, false, self.battery),
                ..Default::default()
            };
        }

        let baseline_fps = average(self.fps_history.iter().take(baseline_len));
        let recent_fps = average(self.fps_history.iter().skip(baseline_len));
        let baseline_ft = average(self.frame_time_history.iter().take(baseline_len));
        let recent_ft = average(self.frame_time_history.iter().skip(baseline_len));

        let fps_drop = baseline_fps - recent_fps;
        let frame_time_increase = recent_ft - baseline_ft;

        let is_throttled = fps_drop >= self.config.fps_drop_threshold
            || frame_time_increase >= self.config.frame_time_increase_threshold;
        let level = ThrottlingLevel::from_fps_drop(fps_drop);

        ThermalStatus {
            is_throttled,
            throttling_level: level,
            performance_impact: (fps_drop / 60.0).clamp(0.0, 1.0),
            recommendations: recommendations(level, is_throttled, self.battery),
        }
    }

    /// Drop all history and return to the unthrottled state
    pub fn reset(&mut self) {
        self.fps_history.clear();
        self.frame_time_history.clear();
        self.status = ThermalStatus::default();
        self.last_check = None;
    }
}

fn average<'a>(values: impl Iterator<Item = &'a f32>) -> f32 {
    let (sum, count) = values.fold((0.0f64, 0usize), |(s, c), v| (s + *v as f64, c + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

fn recommendations(
    level: ThrottlingLevel,
    is_throttled: bool,
    battery: Option<BatteryStatus>,
) -> Vec<String> {
    let mut recs = Vec::new();
    if is_throttled {
        recs.push("Reduce particle count");
        recs.push("Lower effect complexity");
        if level >= ThrottlingLevel::Moderate {
            recs.push("Disable post-processing");
            recs.push("Reduce render resolution");
        }
        if level >= ThrottlingLevel::Severe {
            recs.push("Close other applications");
            recs.push("Lower screen brightness");
        }
    }
    if let Some(battery) = battery.filter(|b| !b.charging) {
        if battery.level < LOW_BATTERY_LEVEL {
            recs.push("Connect a charger");
        }
        if is_throttled || battery.level < LOW_BATTERY_LEVEL {
            recs.push("Enable power saving mode");
        }
    }
    recs.into_iter().map(String::from).collect()
}
