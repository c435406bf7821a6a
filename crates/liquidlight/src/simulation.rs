//! Synthetic inputs for the headless host
//!
//! A four-on-the-floor audio source with a short dropout, and a frame clock
//! whose cost follows the active quality settings and slowly heats up.

use liquidlight_core::{AudioBands, AudioFrame, FrameMetrics, QualitySettings};

/// Kick-drum pattern with slowly drifting mids and highs
#[derive(Debug, Clone)]
pub struct SyntheticAudio {
    beat_interval_ms: f64,
    dropout: Option<(f64, f64)>,
}

impl SyntheticAudio {
    /// Source at `bpm`, silent between `dropout.0` and `dropout.1` (ms)
    pub fn new(bpm: f64, dropout: Option<(f64, f64)>) -> Self {
        Self {
            beat_interval_ms: 60_000.0 / bpm.max(1.0),
            dropout,
        }
    }

    /// Audio frame at `now`, `None` during the dropout
    pub fn frame(&self, now: f64) -> Option<AudioFrame> {
        if let Some((start, end)) = self.dropout {
            if now >= start && now < end {
                return None;
            }
        }

        let phase = (now % self.beat_interval_ms) / self.beat_interval_ms;
        let bass = if phase < 0.07 { 0.95 } else { 0.15 };
        let drift = (now / 3_000.0).sin() as f32 * 0.5 + 0.5;
        let beat_hint = phase < 0.035;

        Some(AudioFrame {
            bands: AudioBands::new(bass, 0.3 + 0.4 * drift, 0.7 - 0.4 * drift, 0.4 + 0.5 * bass),
            beat_hint,
            tempo_hint: Some((60_000.0 / self.beat_interval_ms) as f32),
        })
    }
}

/// Frame cost model of a renderer that heats up over time
#[derive(Debug, Clone)]
pub struct SyntheticRenderer {
    heat_start_ms: f64,
    heat_ramp_ms: f64,
}

impl SyntheticRenderer {
    /// Renderer that starts heating at `heat_start_ms` and reaches full heat
    /// `heat_ramp_ms` later
    pub fn new(heat_start_ms: f64, heat_ramp_ms: f64) -> Self {
        Self {
            heat_start_ms,
            heat_ramp_ms: heat_ramp_ms.max(1.0),
        }
    }

    /// Heat level at `now` (0.0 - 1.0)
    pub fn heat(&self, now: f64) -> f32 {
        ((now - self.heat_start_ms) / self.heat_ramp_ms).clamp(0.0, 1.0) as f32
    }

    /// Frame time (ms) the active settings would cost at `now`
    pub fn frame_time(&self, settings: &QualitySettings, now: f64) -> f32 {
        let particles = settings.particle_count as f32 / 20_000.0 * 6.0;
        let fill = settings.resolution * settings.resolution * 5.0 * settings.effect_complexity;
        let post = if settings.post_processing { 2.0 } else { 0.0 };
        let slowdown = 1.0 + 2.5 * self.heat(now);
        (3.0 + particles + fill + post) * slowdown
    }

    /// Metrics for one frame; the caller fills in the memory fraction
    pub fn metrics(&self, settings: &QualitySettings, now: f64) -> FrameMetrics {
        let frame_time = self.frame_time(settings, now);
        FrameMetrics {
            fps: Some(1000.0 / frame_time),
            frame_time: Some(frame_time),
            draw_calls: settings.max_draw_calls / 2,
            triangles: settings.max_triangles / 2,
            memory_usage: 0.0,
            gpu_time: Some(frame_time * 0.7),
            cpu_time: Some(frame_time * 0.3),
        }
    }
}
