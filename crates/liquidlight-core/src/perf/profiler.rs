//! Frame-timing profiler with threshold alerts
//!
//! Keeps a bounded ring of recent frames, summarizes it on demand and raises
//! typed alerts whenever a frame crosses one of the configured thresholds.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, error, warn};

/// Caller-supplied measurements for one frame
///
/// `fps` and `frame_time` override the values derived from timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameMetrics {
    /// Measured frames per second
    pub fps: Option<f32>,
    /// Measured frame time (ms)
    pub frame_time: Option<f32>,
    /// Draw calls issued this frame
    pub draw_calls: u32,
    /// Triangles submitted this frame
    pub triangles: u32,
    /// Memory usage (0.0 - 1.0)
    pub memory_usage: f32,
    /// GPU time (ms)
    pub gpu_time: Option<f32>,
    /// CPU time (ms)
    pub cpu_time: Option<f32>,
}

/// One recorded frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Frames per second
    pub fps: f32,
    /// Frame time (ms)
    pub frame_time: f32,
    /// Draw calls
    pub draw_calls: u32,
    /// Triangles
    pub triangles: u32,
    /// Memory usage (0.0 - 1.0)
    pub memory_usage: f32,
    /// GPU time (ms)
    pub gpu_time: Option<f32>,
    /// CPU time (ms)
    pub cpu_time: Option<f32>,
    /// Recording time (ms)
    pub timestamp: f64,
}

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Frame rate below target
    FpsLow,
    /// Frame rate above the display rate
    FpsHigh,
    /// Memory pressure
    MemoryHigh,
    /// GPU frame time over budget
    GpuOverload,
    /// CPU frame time over budget
    CpuOverload,
    /// Too many draw calls
    DrawCallsHigh,
}

impl AlertKind {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::FpsLow => "fps-low",
            AlertKind::FpsHigh => "fps-high",
            AlertKind::MemoryHigh => "memory-high",
            AlertKind::GpuOverload => "gpu-overload",
            AlertKind::CpuOverload => "cpu-overload",
            AlertKind::DrawCallsHigh => "draw-calls-high",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational
    Low,
    /// Noticeable
    Medium,
    /// Degraded
    High,
    /// Unusable
    Critical,
}

/// A threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    /// Kind
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Severity
    pub severity: AlertSeverity,
    /// Human-readable description
    pub message: String,
    /// Observed value
    pub value: f32,
    /// Threshold that was crossed
    pub threshold: f32,
    /// Frame timestamp (ms)
    pub timestamp: f64,
}

/// Alert thresholds and severity bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// fps below this raises a medium alert
    pub fps_low: f32,
    /// fps below this is high
    pub fps_low_high: f32,
    /// fps below this is critical
    pub fps_low_critical: f32,
    /// fps above this raises a low alert
    pub fps_high: f32,
    /// memory above this raises a medium alert
    pub memory_high: f32,
    /// memory above this is high
    pub memory_high_high: f32,
    /// memory above this is critical
    pub memory_high_critical: f32,
    /// GPU time (ms) above this raises a medium alert
    pub gpu_time: f32,
    /// GPU time (ms) above this is high
    pub gpu_time_high: f32,
    /// CPU time (ms) above this raises a medium alert
    pub cpu_time: f32,
    /// CPU time (ms) above this is high
    pub cpu_time_high: f32,
    /// draw calls above this raise a medium alert
    pub draw_calls: u32,
    /// draw calls above this are high
    pub draw_calls_high: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            fps_low: 25.0,
            fps_low_high: 20.0,
            fps_low_critical: 15.0,
            fps_high: 60.0,
            memory_high: 0.8,
            memory_high_high: 0.9,
            memory_high_critical: 0.95,
            gpu_time: 16.67,
            gpu_time_high: 33.33,
            cpu_time: 8.33,
            cpu_time_high: 16.67,
            draw_calls: 1000,
            draw_calls_high: 2000,
        }
    }
}

/// Profiler configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Ring buffer capacity (frames)
    pub buffer_capacity: usize,
    /// Maximum retained alerts
    pub max_alerts: usize,
    /// Alert thresholds
    pub thresholds: AlertThresholds,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 300,
            max_alerts: 100,
            thresholds: AlertThresholds::default(),
        }
    }
}

/// Min / max / average of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Minimum
    pub min: f32,
    /// Maximum
    pub max: f32,
    /// Average
    pub avg: f32,
}

impl MetricSummary {
    fn from_values(values: impl Iterator<Item = f32>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v as f64;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            max,
            avg: (sum / count as f64) as f32,
        })
    }
}

/// Summary of the buffered frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Frames per second
    pub fps: MetricSummary,
    /// Frame time (ms)
    pub frame_time: MetricSummary,
    /// Draw calls
    pub draw_calls: MetricSummary,
    /// Triangles
    pub triangles: MetricSummary,
    /// Memory usage
    pub memory_usage: MetricSummary,
    /// GPU time, if any frame reported it
    pub gpu_time: Option<MetricSummary>,
    /// CPU time, if any frame reported it
    pub cpu_time: Option<MetricSummary>,
    /// Number of frames summarized
    pub sample_count: usize,
    /// Time between the oldest and newest frame (ms)
    pub duration_ms: f64,
}

/// Records frames and raises alerts
#[derive(Debug, Clone)]
pub struct PerformanceProfiler {
    config: ProfilerConfig,
    samples: VecDeque<PerformanceSample>,
    alerts: VecDeque<PerformanceAlert>,
    profiling: bool,
    last_frame_time: Option<f64>,
}

impl Default for PerformanceProfiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl PerformanceProfiler {
    /// Create a stopped profiler
    pub fn new(config: ProfilerConfig) -> Self {
        let config = ProfilerConfig {
            buffer_capacity: config.buffer_capacity.max(1),
            ..config
        };
        Self {
            samples: VecDeque::with_capacity(config.buffer_capacity),
            alerts: VecDeque::new(),
            config,
            profiling: false,
            last_frame_time: None,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Begin collecting; `now` is the reference for the first frame time
    pub fn start_profiling(&mut self, now: f64) {
        self.profiling = true;
        self.last_frame_time = Some(now);
        debug!("Profiling started at {:.1}ms", now);
    }

    /// Stop collecting. Buffered samples are kept.
    pub fn stop_profiling(&mut self) {
        self.profiling = false;
        debug!("Profiling stopped with {} samples", self.samples.len());
    }

    /// Whether frames are being recorded
    pub fn is_profiling(&self) -> bool {
        self.profiling
    }

    /// Record one frame and return the alerts it raised
    pub fn record_frame(&mut self, metrics: FrameMetrics, now: f64) -> Vec<PerformanceAlert> {
        if !self.profiling {
            return Vec::new();
        }

        let computed_frame_time = self
            .last_frame_time
            .map_or(0.0, |last| (now - last).max(0.0)) as f32;
        self.last_frame_time = Some(now);

        let frame_time = finite(metrics.frame_time).unwrap_or(computed_frame_time);
        // A zero-length frame carries no rate; keep the last known one
        let fps = finite(metrics.fps).or_else(|| {
            if frame_time > 0.0 {
                Some(1000.0 / frame_time)
            } else {
                self.samples.back().map(|s| s.fps)
            }
        });

        let sample = PerformanceSample {
            fps: fps.unwrap_or_default(),
            frame_time,
            draw_calls: metrics.draw_calls,
            triangles: metrics.triangles,
            memory_usage: if metrics.memory_usage.is_finite() {
                metrics.memory_usage.max(0.0)
            } else {
                0.0
            },
            gpu_time: finite(metrics.gpu_time),
            cpu_time: finite(metrics.cpu_time),
            timestamp: now,
        };

        // Without any rate the frame is not a sample, only its other alerts count
        if fps.is_some() {
            if self.samples.len() >= self.config.buffer_capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }

        let raised = self.evaluate(&sample, fps.is_some());
        for alert in &raised {
            match alert.severity {
                AlertSeverity::Critical => error!("{} ({})", alert.message, alert.kind),
                AlertSeverity::High => warn!("{} ({})", alert.message, alert.kind),
                _ => {}
            }
            if self.alerts.len() >= self.config.max_alerts {
                self.alerts.pop_front();
            }
            self.alerts.push_back(alert.clone());
        }
        raised
    }

    fn evaluate(&self, sample: &PerformanceSample, has_rate: bool) -> Vec<PerformanceAlert> {
        let t = &self.config.thresholds;
        let mut alerts = Vec::new();
        let mut raise = |kind, severity, message: String, value: f32, threshold: f32| {
            alerts.push(PerformanceAlert {
                kind,
                severity,
                message,
                value,
                threshold,
                timestamp: sample.timestamp,
            });
        };

        if has_rate {
            if sample.fps < t.fps_low {
                let severity = if sample.fps < t.fps_low_critical {
                    AlertSeverity::Critical
                } else if sample.fps < t.fps_low_high {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                };
                raise(
                    AlertKind::FpsLow,
                    severity,
                    format!("Low frame rate: {:.1} fps", sample.fps),
                    sample.fps,
                    t.fps_low,
                );
            } else if sample.fps > t.fps_high {
                raise(
                    AlertKind::FpsHigh,
                    AlertSeverity::Low,
                    format!("Frame rate above display rate: {:.1} fps", sample.fps),
                    sample.fps,
                    t.fps_high,
                );
            }
        }

        if sample.memory_usage > t.memory_high {
            let severity = if sample.memory_usage > t.memory_high_critical {
                AlertSeverity::Critical
            } else if sample.memory_usage > t.memory_high_high {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            raise(
                AlertKind::MemoryHigh,
                severity,
                format!("High memory usage: {:.0}%", sample.memory_usage * 100.0),
                sample.memory_usage,
                t.memory_high,
            );
        }

        if let Some(gpu) = sample.gpu_time.filter(|g| *g > t.gpu_time) {
            let severity = if gpu > t.gpu_time_high {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            raise(
                AlertKind::GpuOverload,
                severity,
                format!("GPU frame time {:.2}ms over budget", gpu),
                gpu,
                t.gpu_time,
            );
        }

        if let Some(cpu) = sample.cpu_time.filter(|c| *c > t.cpu_time) {
            let severity = if cpu > t.cpu_time_high {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            raise(
                AlertKind::CpuOverload,
                severity,
                format!("CPU frame time {:.2}ms over budget", cpu),
                cpu,
                t.cpu_time,
            );
        }

        if sample.draw_calls > t.draw_calls {
            let severity = if sample.draw_calls > t.draw_calls_high {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            raise(
                AlertKind::DrawCallsHigh,
                severity,
                format!("{} draw calls in one frame", sample.draw_calls),
                sample.draw_calls as f32,
                t.draw_calls as f32,
            );
        }

        alerts
    }

    /// Summary of the buffered frames, `None` when nothing was recorded
    pub fn get_performance_profile(&self) -> Option<PerformanceProfile> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let s = &self.samples;
        Some(PerformanceProfile {
            fps: MetricSummary::from_values(s.iter().map(|x| x.fps))?,
            frame_time: MetricSummary::from_values(s.iter().map(|x| x.frame_time))?,
            draw_calls: MetricSummary::from_values(s.iter().map(|x| x.draw_calls as f32))?,
            triangles: MetricSummary::from_values(s.iter().map(|x| x.triangles as f32))?,
            memory_usage: MetricSummary::from_values(s.iter().map(|x| x.memory_usage))?,
            gpu_time: MetricSummary::from_values(s.iter().filter_map(|x| x.gpu_time)),
            cpu_time: MetricSummary::from_values(s.iter().filter_map(|x| x.cpu_time)),
            sample_count: s.len(),
            duration_ms: last.timestamp - first.timestamp,
        })
    }

    /// Most recent frame
    pub fn latest_sample(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    /// Buffered frames, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }

    /// Retained alerts, oldest first
    pub fn alerts(&self) -> impl Iterator<Item = &PerformanceAlert> {
        self.alerts.iter()
    }

    /// Drop retained alerts
    pub fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    /// Retained alerts as a JSON array
    pub fn export_alerts_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.alerts)?)
    }

    /// Drop all samples and alerts and stop profiling
    pub fn reset(&mut self) {
        self.samples.clear();
        self.alerts.clear();
        self.profiling = false;
        self.last_frame_time = None;
    }
}

fn finite(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite())
}
