//! Adaptive-threshold beat detector with median-interval tempo tracking
//!
//! The detector keeps an exponential moving average of the incoming energy and
//! of its variance. A beat is a sample that rises above
//! `average + threshold_multiplier * std_dev`, exceeds the previous average and
//! falls outside the refractory window of the previous beat.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Samples used only to seed the averages
pub const INIT_SAMPLES: usize = 10;

/// Capacity of the inter-beat interval history
pub const INTERVAL_HISTORY: usize = 16;

/// One energy reading from the analysis front end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Energy (0 - 100 domain)
    pub energy: f32,
    /// Timestamp in milliseconds
    pub timestamp: f64,
}

impl EnergySample {
    /// Create a new sample
    pub fn new(energy: f32, timestamp: f64) -> Self {
        Self { energy, timestamp }
    }
}

/// Result of a single `detect` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Whether a beat was accepted on this sample
    pub is_beat: bool,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Current tempo estimate, 0 when unknown
    pub bpm_estimate: f32,
    /// Energy of this sample
    pub energy: f32,
    /// Running average energy after this sample
    pub average_energy: f32,
    /// Timestamp in milliseconds
    pub timestamp: f64,
}

/// Configuration for [`BeatDetector`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatDetectorConfig {
    /// EMA weight of the previous average (closer to 1 = slower)
    pub average_alpha: f32,
    /// EMA weight of the previous variance
    pub variance_alpha: f32,
    /// Standard deviations above the average needed for a beat
    pub threshold_multiplier: f32,
    /// Minimum time between two accepted beats
    pub refractory_period_ms: f64,
    /// Minimum confidence for a beat to be accepted
    pub min_confidence: f32,
    /// Lowest plausible tempo
    pub bpm_min: f32,
    /// Highest plausible tempo
    pub bpm_max: f32,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            average_alpha: 0.98,
            variance_alpha: 0.98,
            threshold_multiplier: 1.5,
            refractory_period_ms: 150.0,
            min_confidence: 0.5,
            bpm_min: 60.0,
            bpm_max: 180.0,
        }
    }
}

impl BeatDetectorConfig {
    /// Sensitive preset for four-on-the-floor dance music
    pub fn dance_floor() -> Self {
        Self {
            threshold_multiplier: 1.2,
            refractory_period_ms: 100.0,
            bpm_min: 100.0,
            bpm_max: 180.0,
            ..Self::default()
        }
    }

    /// Relaxed preset for slow, ambient material
    pub fn ambient() -> Self {
        Self {
            threshold_multiplier: 2.0,
            refractory_period_ms: 250.0,
            bpm_min: 60.0,
            bpm_max: 120.0,
            ..Self::default()
        }
    }

    /// Shortest inter-beat interval considered plausible (ms)
    pub fn min_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm_max as f64
    }

    /// Longest inter-beat interval considered plausible (ms)
    pub fn max_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm_min as f64
    }

    /// Check that every field is inside its domain
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.average_alpha) || !(0.0..1.0).contains(&self.variance_alpha)
        {
            return Err(CoreError::InvalidConfig(format!(
                "beat detector alphas must be in [0, 1), got {} / {}",
                self.average_alpha, self.variance_alpha
            )));
        }
        if self.threshold_multiplier < 0.0 || self.refractory_period_ms < 0.0 {
            return Err(CoreError::InvalidConfig(
                "beat detector threshold and refractory period must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(CoreError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.bpm_min <= 0.0 || self.bpm_max <= self.bpm_min {
            return Err(CoreError::InvalidConfig(format!(
                "invalid bpm range [{}, {}]",
                self.bpm_min, self.bpm_max
            )));
        }
        Ok(())
    }
}

/// Adaptive-threshold beat and tempo detector
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatDetectorConfig,
    average_energy: f32,
    variance: f32,
    previous_energy: f32,
    sample_count: usize,
    last_beat_time: Option<f64>,
    /// Plausible inter-beat intervals, oldest first
    intervals: VecDeque<f64>,
    bpm_estimate: f32,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(BeatDetectorConfig::default())
    }
}

impl BeatDetector {
    /// Create a detector with the given configuration
    pub fn new(config: BeatDetectorConfig) -> Self {
        Self {
            config,
            average_energy: 0.0,
            variance: 0.0,
            previous_energy: 0.0,
            sample_count: 0,
            last_beat_time: None,
            intervals: VecDeque::with_capacity(INTERVAL_HISTORY),
            bpm_estimate: 0.0,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }

    /// Current running average energy
    pub fn average_energy(&self) -> f32 {
        self.average_energy
    }

    /// Current tempo estimate (0 when unknown)
    pub fn bpm(&self) -> f32 {
        self.bpm_estimate
    }

    /// Whether the warm-up period is over
    pub fn is_warmed_up(&self) -> bool {
        self.sample_count >= INIT_SAMPLES
    }

    /// Process one energy sample
    pub fn detect(&mut self, sample: EnergySample) -> BeatEvent {
        let energy = if sample.energy.is_finite() {
            sample.energy.max(0.0)
        } else {
            0.0
        };
        let timestamp = sample.timestamp;

        self.sample_count = self.sample_count.saturating_add(1);

        if self.sample_count <= INIT_SAMPLES {
            self.fold(energy);
            return self.event(false, 0.0, energy, timestamp);
        }

        let std_dev = self.variance.max(0.0).sqrt();
        let threshold = self.average_energy + self.config.threshold_multiplier * std_dev;
        let previous_average = self.average_energy;

        let outside_refractory = self
            .last_beat_time
            .map_or(true, |last| timestamp - last >= self.config.refractory_period_ms);

        let mut is_beat = false;
        let mut confidence = 0.0;

        if energy > threshold && energy > previous_average && outside_refractory {
            confidence = ((energy - threshold) / (std_dev + 1.0) / 2.0).min(1.0);
            if energy > self.previous_energy {
                confidence = (confidence * 1.2).min(1.0);
            }

            if confidence >= self.config.min_confidence {
                is_beat = true;
                self.register_beat(timestamp);
                trace!(
                    "Beat at {:.1}ms: energy={:.2} threshold={:.2} confidence={:.2} bpm={:.1}",
                    timestamp,
                    energy,
                    threshold,
                    confidence,
                    self.bpm_estimate
                );
            }
        }

        self.fold(energy);
        self.event(is_beat, confidence, energy, timestamp)
    }

    /// Clear all state, e.g. when the audio source changes
    pub fn reset(&mut self) {
        self.average_energy = 0.0;
        self.variance = 0.0;
        self.previous_energy = 0.0;
        self.sample_count = 0;
        self.last_beat_time = None;
        self.intervals.clear();
        self.bpm_estimate = 0.0;

        debug!("BeatDetector reset");
    }

    /// Fold a sample into the running average and variance
    fn fold(&mut self, energy: f32) {
        if self.sample_count <= 1 {
            self.average_energy = energy;
            self.variance = 0.0;
        } else {
            let deviation = energy - self.average_energy;
            let a = self.config.average_alpha;
            let v = self.config.variance_alpha;
            self.average_energy = a * self.average_energy + (1.0 - a) * energy;
            self.variance = v * self.variance + (1.0 - v) * deviation * deviation;
        }
        self.previous_energy = energy;
    }

    fn register_beat(&mut self, timestamp: f64) {
        if let Some(last) = self.last_beat_time {
            let interval = timestamp - last;
            let plausible = self.config.min_interval_ms()..=self.config.max_interval_ms();
            if plausible.contains(&interval) {
                self.intervals.push_back(interval);
                if self.intervals.len() > INTERVAL_HISTORY {
                    self.intervals.pop_front();
                }
            }
        }
        self.last_beat_time = Some(timestamp);
        self.bpm_estimate = self.calculate_bpm();
    }

    /// Tempo from the median of the recorded intervals
    fn calculate_bpm(&self) -> f32 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f64> = self.intervals.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        if median <= 0.0 {
            return 0.0;
        }

        let bpm = (60_000.0 / median) as f32;
        bpm.clamp(self.config.bpm_min, self.config.bpm_max)
    }

    fn event(&self, is_beat: bool, confidence: f32, energy: f32, timestamp: f64) -> BeatEvent {
        BeatEvent {
            is_beat,
            confidence,
            bpm_estimate: self.bpm_estimate,
            energy,
            average_energy: self.average_energy,
            timestamp,
        }
    }
}
