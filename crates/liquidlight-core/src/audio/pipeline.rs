//! Per-frame audio-reactive pipeline
//!
//! Runs smoothing, curve shaping, beat detection, the beat gate and the physics
//! mapping in that order, once per animation frame.

use super::beat_detector::{BeatDetector, BeatDetectorConfig, BeatEvent, EnergySample};
use super::beat_gate::{BeatGate, BeatGateConfig};
use super::curves::CurveConfig;
use super::physics::{PhysicsMapper, PhysicsParameterSet};
use super::smoother::{EnergySmoother, DEFAULT_ALPHA};
use crate::{clamp01, CoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const BASS: &str = "bass";
const MIDS: &str = "mids";
const TREBLE: &str = "treble";
const VOLUME: &str = "volume";

/// Normalized band levels delivered by the audio front end
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioBands {
    /// Low frequencies (0.0 - 1.0)
    pub bass: f32,
    /// Mid frequencies (0.0 - 1.0)
    pub mids: f32,
    /// High frequencies (0.0 - 1.0)
    pub treble: f32,
    /// Overall loudness (0.0 - 1.0)
    pub volume: f32,
}

impl AudioBands {
    /// Create a band set
    pub fn new(bass: f32, mids: f32, treble: f32, volume: f32) -> Self {
        Self {
            bass,
            mids,
            treble,
            volume,
        }
    }

    /// Copy with every level clamped to `[0, 1]` and NaN/Inf replaced by 0
    pub fn sanitized(&self) -> Self {
        Self {
            bass: clamp01(self.bass),
            mids: clamp01(self.mids),
            treble: clamp01(self.treble),
            volume: clamp01(self.volume),
        }
    }
}

/// One analysis frame from the audio front end
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    /// Band levels
    pub bands: AudioBands,
    /// Coarse beat flag computed by the front end
    pub beat_hint: bool,
    /// Coarse tempo computed by the front end, reported until the detector
    /// has an estimate of its own
    pub tempo_hint: Option<f32>,
}

impl AudioFrame {
    /// Frame without hints
    pub fn from_bands(bands: AudioBands) -> Self {
        Self {
            bands,
            beat_hint: false,
            tempo_hint: None,
        }
    }
}

/// Configuration of the audio-reactive chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioReactiveConfig {
    /// EMA factor of the band smoother
    pub smoothing_alpha: f32,
    /// Scale from normalized bass to the detector's energy domain
    pub energy_scale: f32,
    /// Also trigger the beat gate on the front end's beat hint
    pub trust_beat_hint: bool,
    /// Beat detector parameters
    pub beat: BeatDetectorConfig,
    /// Beat gate parameters
    pub gate: BeatGateConfig,
    /// Response curve parameters
    pub curves: CurveConfig,
}

impl Default for AudioReactiveConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_ALPHA,
            energy_scale: 100.0,
            trust_beat_hint: false,
            beat: BeatDetectorConfig::default(),
            gate: BeatGateConfig::default(),
            curves: CurveConfig::default(),
        }
    }
}

impl AudioReactiveConfig {
    /// Check that every field is inside its domain
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.smoothing_alpha) {
            return Err(CoreError::InvalidConfig(format!(
                "smoothing_alpha must be in [0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if self.energy_scale <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "energy_scale must be positive".to_string(),
            ));
        }
        if self.gate.burst_multiplier < 1.0 || self.gate.decay_time_ms < 0.0 {
            return Err(CoreError::InvalidConfig(
                "beat gate needs burst_multiplier >= 1 and a non-negative decay".to_string(),
            ));
        }
        self.curves.validate()?;
        self.beat.validate()
    }
}

/// Output of one pipeline step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrameOutput {
    /// Parameters for the renderer
    pub params: PhysicsParameterSet,
    /// Detector result, `None` when no audio was available
    pub beat: Option<BeatEvent>,
    /// Beat gate multiplier applied to the splat force
    pub burst: f32,
}

/// Owns the audio conditioning chain for one audio source
#[derive(Debug, Clone)]
pub struct AudioReactivePipeline {
    config: AudioReactiveConfig,
    smoother: EnergySmoother,
    detector: BeatDetector,
    gate: BeatGate,
    mapper: PhysicsMapper,
    last_timestamp: Option<f64>,
}

impl Default for AudioReactivePipeline {
    fn default() -> Self {
        Self::new(AudioReactiveConfig::default())
    }
}

impl AudioReactivePipeline {
    /// Build the chain from its configuration
    pub fn new(config: AudioReactiveConfig) -> Self {
        Self {
            config,
            smoother: EnergySmoother::new(config.smoothing_alpha),
            detector: BeatDetector::new(config.beat),
            gate: BeatGate::new(config.gate),
            mapper: PhysicsMapper::new(config.curves),
            last_timestamp: None,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &AudioReactiveConfig {
        &self.config
    }

    /// Beat detector state
    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    /// Run one frame. `now` is in milliseconds.
    pub fn process(&mut self, frame: Option<&AudioFrame>, now: f64) -> AudioFrameOutput {
        let delta_ms = self
            .last_timestamp
            .map_or(0.0, |last| (now - last).max(0.0)) as f32;
        self.last_timestamp = Some(now);

        let Some(frame) = frame else {
            let burst = self.gate.update(false, delta_ms);
            return AudioFrameOutput {
                params: PhysicsParameterSet::base(),
                beat: None,
                burst,
            };
        };

        let raw = frame.bands.sanitized();
        let smoothed = AudioBands {
            bass: self.smoother.smooth(BASS, raw.bass),
            mids: self.smoother.smooth(MIDS, raw.mids),
            treble: self.smoother.smooth(TREBLE, raw.treble),
            volume: self.smoother.smooth(VOLUME, raw.volume),
        };

        let energy = self.mapper.curves().power(smoothed.bass) * self.config.energy_scale;
        let mut beat = self.detector.detect(EnergySample::new(energy, now));
        if beat.bpm_estimate == 0.0 {
            if let Some(hint) = frame.tempo_hint.filter(|t| t.is_finite() && *t > 0.0) {
                let beat_config = &self.config.beat;
                beat.bpm_estimate = hint.clamp(beat_config.bpm_min, beat_config.bpm_max);
            }
        }

        let triggered = beat.is_beat || (self.config.trust_beat_hint && frame.beat_hint);
        let burst = self.gate.update(triggered, delta_ms);

        AudioFrameOutput {
            params: self.mapper.calculate_physics_params(Some(&smoothed), burst),
            beat: Some(beat),
            burst,
        }
    }

    /// Clear all per-source state
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.detector.reset();
        self.gate.reset();
        self.last_timestamp = None;
        debug!("AudioReactivePipeline reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_audio_yields_base() {
        let mut pipeline = AudioReactivePipeline::default();
        let out = pipeline.process(None, 0.0);
        assert_eq!(out.params, PhysicsParameterSet::base());
        assert!(out.beat.is_none());
        assert_eq!(out.burst, 1.0);
    }

    #[test]
    fn test_kick_triggers_burst() {
        let mut pipeline = AudioReactivePipeline::default();
        let quiet = AudioFrame::from_bands(AudioBands::new(0.1, 0.3, 0.3, 0.3));
        let kick = AudioFrame::from_bands(AudioBands::new(1.0, 0.3, 0.3, 0.8));

        let mut now = 0.0;
        for _ in 0..30 {
            let out = pipeline.process(Some(&quiet), now);
            assert!(!out.beat.map(|b| b.is_beat).unwrap_or(false));
            now += 16.0;
        }

        let out = pipeline.process(Some(&kick), now);
        let beat = out.beat.expect("audio frame should produce a beat event");
        assert!(beat.is_beat, "kick not detected: {:?}", beat);
        assert_eq!(out.burst, 1.5);
    }

    #[test]
    fn test_beat_hint_only_when_trusted() {
        let frame = AudioFrame {
            bands: AudioBands::new(0.2, 0.2, 0.2, 0.2),
            beat_hint: true,
            tempo_hint: Some(128.0),
        };

        let mut ignoring = AudioReactivePipeline::default();
        assert_eq!(ignoring.process(Some(&frame), 0.0).burst, 1.0);

        let mut trusting = AudioReactivePipeline::new(AudioReactiveConfig {
            trust_beat_hint: true,
            ..Default::default()
        });
        assert_eq!(trusting.process(Some(&frame), 0.0).burst, 1.5);
    }

    #[test]
    fn test_tempo_hint_fills_missing_estimate() {
        let mut pipeline = AudioReactivePipeline::default();
        let hinted = |tempo| AudioFrame {
            bands: AudioBands::new(0.2, 0.2, 0.2, 0.2),
            beat_hint: false,
            tempo_hint: Some(tempo),
        };

        let out = pipeline.process(Some(&hinted(128.0)), 0.0);
        assert_eq!(out.beat.unwrap().bpm_estimate, 128.0);
        assert_eq!(pipeline.detector().bpm(), 0.0);

        // clamped into the detector's range
        let out = pipeline.process(Some(&hinted(400.0)), 16.0);
        assert_eq!(out.beat.unwrap().bpm_estimate, 180.0);

        let out = pipeline.process(Some(&hinted(f32::NAN)), 32.0);
        assert_eq!(out.beat.unwrap().bpm_estimate, 0.0);
        let plain = AudioFrame::from_bands(AudioBands::new(0.2, 0.2, 0.2, 0.2));
        assert_eq!(pipeline.process(Some(&plain), 48.0).beat.unwrap().bpm_estimate, 0.0);
    }

    #[test]
    fn test_malformed_audio_is_clamped() {
        let mut pipeline = AudioReactivePipeline::default();
        let frame = AudioFrame::from_bands(AudioBands::new(f32::NAN, 7.0, -3.0, f32::INFINITY));
        let out = pipeline.process(Some(&frame), 0.0);
        let p = out.params;
        for v in [
            p.splat_force,
            p.thermal_rate,
            p.color_phase,
            p.intensity,
            p.curl_strength,
            p.viscosity,
        ] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_reset_clears_detector() {
        let mut pipeline = AudioReactivePipeline::default();
        let frame = AudioFrame::from_bands(AudioBands::new(0.5, 0.5, 0.5, 0.5));
        for i in 0..20 {
            pipeline.process(Some(&frame), i as f64 * 16.0);
        }
        assert!(pipeline.detector().is_warmed_up());
        pipeline.reset();
        assert!(!pipeline.detector().is_warmed_up());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AudioReactiveConfig::default().validate().is_ok());
        let bad = AudioReactiveConfig {
            smoothing_alpha: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad_knee = AudioReactiveConfig {
            curves: CurveConfig {
                knee_center: 0.95,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bad_knee.validate().is_err());
    }
}
