//! Beat-triggered burst envelope

use serde::{Deserialize, Serialize};

/// Configuration for [`BeatGate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatGateConfig {
    /// Envelope value set on a beat (>= 1.0)
    pub burst_multiplier: f32,
    /// Time for the envelope to fall back to 1.0
    pub decay_time_ms: f32,
    /// Beats closer together than this are ignored
    pub min_interval_ms: f32,
}

impl Default for BeatGateConfig {
    fn default() -> Self {
        Self {
            burst_multiplier: 1.5,
            decay_time_ms: 200.0,
            min_interval_ms: 100.0,
        }
    }
}

/// Transient envelope used as a multiplicative burst on beats.
///
/// The returned multiplier never drops below 1.0.
#[derive(Debug, Clone)]
pub struct BeatGate {
    config: BeatGateConfig,
    envelope: f32,
    since_last_trigger_ms: Option<f32>,
}

impl Default for BeatGate {
    fn default() -> Self {
        Self::new(BeatGateConfig::default())
    }
}

impl BeatGate {
    /// Create a gate at rest (multiplier 1.0)
    pub fn new(config: BeatGateConfig) -> Self {
        Self {
            config: BeatGateConfig {
                burst_multiplier: config.burst_multiplier.max(1.0),
                ..config
            },
            envelope: 1.0,
            since_last_trigger_ms: None,
        }
    }

    /// Current multiplier without advancing time
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Advance the envelope by `delta_ms` and return the multiplier
    pub fn update(&mut self, is_beat: bool, delta_ms: f32) -> f32 {
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };

        if let Some(elapsed) = self.since_last_trigger_ms.as_mut() {
            *elapsed += delta_ms;
        }

        let debounced = self
            .since_last_trigger_ms
            .map_or(true, |elapsed| elapsed >= self.config.min_interval_ms);

        if is_beat && debounced {
            self.envelope = self.config.burst_multiplier;
            self.since_last_trigger_ms = Some(0.0);
            return self.envelope;
        }

        if self.envelope > 1.0 {
            if self.config.decay_time_ms <= 0.0 {
                self.envelope = 1.0;
            } else {
                let rate = (self.config.burst_multiplier - 1.0) / self.config.decay_time_ms;
                self.envelope = (self.envelope - rate * delta_ms).max(1.0);
            }
        }

        self.envelope
    }

    /// Return to rest
    pub fn reset(&mut self) {
        self.envelope = 1.0;
        self.since_last_trigger_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_state() {
        let mut gate = BeatGate::default();
        assert_eq!(gate.update(false, 16.0), 1.0);
    }

    #[test]
    fn test_beat_sets_burst() {
        let mut gate = BeatGate::default();
        assert_eq!(gate.update(true, 16.0), 1.5);
    }

    #[test]
    fn test_linear_decay() {
        let mut gate = BeatGate::default();
        gate.update(true, 0.0);
        // 0.5 over 200ms -> 0.0025 / ms
        let v = gate.update(false, 100.0);
        assert!((v - 1.25).abs() < 1e-5, "got {}", v);
        let v = gate.update(false, 100.0);
        assert!((v - 1.0).abs() < 1e-5, "got {}", v);
        assert_eq!(gate.update(false, 100.0), 1.0);
    }

    #[test]
    fn test_debounce() {
        let mut gate = BeatGate::default();
        gate.update(true, 0.0);
        let v = gate.update(false, 60.0);
        // second beat 60ms later is ignored and the envelope keeps decaying
        let w = gate.update(true, 20.0);
        assert!(w < v);
        // 120ms after the first beat a new one is accepted
        assert_eq!(gate.update(true, 40.0), 1.5);
    }

    #[test]
    fn test_reset() {
        let mut gate = BeatGate::default();
        gate.update(true, 0.0);
        gate.reset();
        assert_eq!(gate.envelope(), 1.0);
        assert_eq!(gate.update(true, 0.0), 1.5);
    }

    #[test]
    fn test_multiplier_below_one_is_raised() {
        let mut gate = BeatGate::new(BeatGateConfig {
            burst_multiplier: 0.5,
            ..Default::default()
        });
        assert_eq!(gate.update(true, 0.0), 1.0);
    }
}
