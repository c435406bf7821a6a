//! EMA smoother bank for per-channel audio levels

use std::collections::HashMap;

/// Default smoothing factor (weight of the newest value)
pub const DEFAULT_ALPHA: f32 = 0.3;

/// Exponential-moving-average bank keyed by channel name.
///
/// `smooth(key, v) = alpha * v + (1 - alpha) * previous`. Lower alpha gives a
/// smoother, slower response. The first value seen for a key passes through
/// unchanged.
#[derive(Debug, Clone)]
pub struct EnergySmoother {
    alpha: f32,
    values: HashMap<String, f32>,
}

impl Default for EnergySmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl EnergySmoother {
    /// Create a smoother bank. `alpha` is clamped to `[0, 1]`.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: crate::clamp01(alpha),
            values: HashMap::new(),
        }
    }

    /// Smoothing factor in use
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Fold `value` into the channel `key` and return the smoothed level.
    ///
    /// Non-finite values are treated as silence.
    pub fn smooth(&mut self, key: &str, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { 0.0 };
        let alpha = self.alpha;

        if let Some(previous) = self.values.get_mut(key) {
            *previous = alpha * value + (1.0 - alpha) * *previous;
            *previous
        } else {
            self.values.insert(key.to_string(), value);
            value
        }
    }

    /// Last smoothed value of a channel
    pub fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    /// Forget a single channel
    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Forget every channel
    pub fn reset(&mut self) {
        self.values.clear();
    }
}
