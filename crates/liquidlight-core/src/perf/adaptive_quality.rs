//! Score-driven fine-grained quality adaptation

use super::device::DeviceProfile;
use super::quality::{QualitySettings, Tier};
use crate::{clamp01, CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Configuration for [`AdaptiveQualityManager`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveQualityConfig {
    /// Frame rate the engine aims for
    pub target_fps: f32,
    /// Frame time that scores zero (ms)
    pub max_frame_time_ms: f32,
    /// Memory usage that scores zero
    pub max_memory_usage: f32,
    /// Scores below this step quality down
    pub degrade_threshold: f32,
    /// Scores above this (with fps over target) step quality up
    pub upgrade_threshold: f32,
    /// Pause after a step down (ms)
    pub degrade_cooldown_ms: f64,
    /// Pause after a step up (ms)
    pub upgrade_cooldown_ms: f64,
    /// Length of the fps/memory histories
    pub history_size: usize,
}

impl Default for AdaptiveQualityConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            max_frame_time_ms: 33.33,
            max_memory_usage: 0.8,
            degrade_threshold: 0.3,
            upgrade_threshold: 0.8,
            degrade_cooldown_ms: 2000.0,
            upgrade_cooldown_ms: 5000.0,
            history_size: 60,
        }
    }
}

impl AdaptiveQualityConfig {
    /// Check that every field is inside its domain
    pub fn validate(&self) -> Result<()> {
        if self.target_fps <= 0.0 || self.max_frame_time_ms <= 0.0 || self.max_memory_usage <= 0.0
        {
            return Err(CoreError::InvalidConfig(
                "adaptive quality targets must be positive".to_string(),
            ));
        }
        if self.degrade_threshold >= self.upgrade_threshold {
            return Err(CoreError::InvalidConfig(format!(
                "degrade_threshold ({}) must be below upgrade_threshold ({})",
                self.degrade_threshold, self.upgrade_threshold
            )));
        }
        if self.history_size == 0 {
            return Err(CoreError::InvalidConfig(
                "history_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Direction of an applied adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityAdjustment {
    /// Quality was reduced
    Decreased,
    /// Quality was raised
    Increased,
}

/// Adjusts [`QualitySettings`] from a rolling performance score
#[derive(Debug, Clone)]
pub struct AdaptiveQualityManager {
    config: AdaptiveQualityConfig,
    profile: DeviceProfile,
    tier: Tier,
    settings: QualitySettings,
    fps_history: VecDeque<f32>,
    memory_history: VecDeque<f32>,
    cooldown_until: f64,
    last_score: Option<f32>,
}

impl AdaptiveQualityManager {
    /// Start from the profile's recommended tier and settings
    pub fn new(profile: DeviceProfile, config: AdaptiveQualityConfig) -> Self {
        Self {
            tier: profile.recommended_tier,
            settings: profile.recommended_settings,
            fps_history: VecDeque::with_capacity(config.history_size),
            memory_history: VecDeque::with_capacity(config.history_size),
            config,
            profile,
            cooldown_until: f64::NEG_INFINITY,
            last_score: None,
        }
    }

    /// Current settings
    pub fn settings(&self) -> &QualitySettings {
        &self.settings
    }

    /// Tier the settings are bounded by
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Score computed by the last evaluation outside the cooldown
    pub fn performance_score(&self) -> Option<f32> {
        self.last_score
    }

    /// Mean of the fps history
    pub fn average_fps(&self) -> Option<f32> {
        mean(&self.fps_history)
    }

    /// Mean of the memory history
    pub fn average_memory(&self) -> Option<f32> {
        mean(&self.memory_history)
    }

    /// Whether adjustments are suspended at `now`
    pub fn in_cooldown(&self, now: f64) -> bool {
        now < self.cooldown_until
    }

    /// Score of one measurement, in `[0, 1]`
    pub fn score(&self, fps: f32, frame_time: f32, memory: f32) -> f32 {
        let c = &self.config;
        let fps_score = (fps / c.target_fps).min(1.0).max(0.0);
        let frame_score = (1.0 - frame_time / c.max_frame_time_ms).max(0.0);
        let memory_score = (1.0 - memory / c.max_memory_usage).max(0.0);
        clamp01((fps_score + frame_score + memory_score) / 3.0)
    }

    /// Feed one measurement. Returns the adjustment applied, if any.
    pub fn update_performance(
        &mut self,
        fps: f32,
        frame_time: f32,
        memory: f32,
        now: f64,
    ) -> Option<QualityAdjustment> {
        let fps = if fps.is_finite() { fps.max(0.0) } else { 0.0 };
        let frame_time = if frame_time.is_finite() {
            frame_time.max(0.0)
        } else {
            self.config.max_frame_time_ms
        };
        let memory = if memory.is_finite() {
            memory.max(0.0)
        } else {
            self.config.max_memory_usage
        };

        push_bounded(&mut self.fps_history, fps, self.config.history_size);
        push_bounded(&mut self.memory_history, memory, self.config.history_size);

        if self.in_cooldown(now) {
            return None;
        }

        let score = self.score(fps, frame_time, memory);
        self.last_score = Some(score);

        if score < self.config.degrade_threshold {
            self.cooldown_until = now + self.config.degrade_cooldown_ms;
            let next = self.settings.stepped_down(self.tier);
            return self.apply(next, QualityAdjustment::Decreased, score);
        }

        if score > self.config.upgrade_threshold && fps > self.config.target_fps {
            self.cooldown_until = now + self.config.upgrade_cooldown_ms;
            let next = self.settings.stepped_up(self.tier);
            return self.apply(next, QualityAdjustment::Increased, score);
        }

        None
    }

    fn apply(
        &mut self,
        next: QualitySettings,
        direction: QualityAdjustment,
        score: f32,
    ) -> Option<QualityAdjustment> {
        if next == self.settings {
            debug!("Quality already at its bound ({:?}), score {:.2}", direction, score);
            return None;
        }
        self.settings = next;
        info!(
            "Quality {:?} (score {:.2}): resolution={:.2} particles={} texture={:?}",
            direction, score, next.resolution, next.particle_count, next.texture_quality
        );
        Some(direction)
    }

    /// Bound the settings by a new tier (never above the device's maximum)
    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier.min(self.profile.max_tier);
        self.settings = self.settings.validated(self.tier);
    }

    /// Revert to the device profile's defaults
    pub fn reset_to_recommended(&mut self) {
        self.tier = self.profile.recommended_tier;
        self.settings = self.profile.recommended_settings;
        self.cooldown_until = f64::NEG_INFINITY;
        self.last_score = None;
        debug!("Quality reset to recommended {} settings", self.tier);
    }
}

fn push_bounded(history: &mut VecDeque<f32>, value: f32, capacity: usize) {
    if history.len() >= capacity.max(1) {
        history.pop_front();
    }
    history.push_back(value);
}

fn mean(values: &VecDeque<f32>) -> Option<f32> {
    (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::quality::{MIN_PARTICLES, MIN_RESOLUTION};

    fn manager(tier: Tier) -> AdaptiveQualityManager {
        AdaptiveQualityManager::new(DeviceProfile::for_tier(tier), AdaptiveQualityConfig::default())
    }

    #[test]
    fn test_score() {
        let m = manager(Tier::High);
        assert!((m.score(60.0, 0.0, 0.0) - 1.0).abs() < 1e-6);
        assert_eq!(m.score(0.0, 40.0, 0.9), 0.0);
        // fps 30 -> 0.5, frame 16.665 -> 0.5, memory 0.4 -> 0.5
        assert!((m.score(30.0, 16.665, 0.4) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_poor_performance_steps_down() {
        let mut m = manager(Tier::High);
        let initial = *m.settings();
        assert_eq!(
            m.update_performance(25.0, 40.0, 0.9, 0.0),
            Some(QualityAdjustment::Decreased)
        );
        assert!(m.settings().resolution < initial.resolution);
        assert!(m.settings().particle_count < initial.particle_count);
        assert!(!m.settings().post_processing);
    }

    #[test]
    fn test_cooldown_blocks_adjustment() {
        let mut m = manager(Tier::High);
        assert!(m.update_performance(25.0, 40.0, 0.9, 0.0).is_some());
        assert!(m.in_cooldown(1000.0));
        assert!(m.update_performance(25.0, 40.0, 0.9, 1000.0).is_none());
        assert!(m.update_performance(25.0, 40.0, 0.9, 2000.0).is_some());
    }

    #[test]
    fn test_sustained_poor_performance_hits_floors() {
        for tier in Tier::ALL {
            let mut m = manager(tier);
            let initial = *m.settings();
            for i in 0..10 {
                m.update_performance(25.0, 40.0, 0.9, i as f64 * 2500.0);
            }
            let s = m.settings();
            assert!(s.resolution < initial.resolution, "tier {}", tier);
            assert!(s.particle_count < initial.particle_count, "tier {}", tier);
            assert!(s.resolution >= MIN_RESOLUTION);
            assert!(s.particle_count >= MIN_PARTICLES);
        }
    }

    #[test]
    fn test_excellent_performance_steps_up() {
        let mut m = manager(Tier::Ultra);
        m.update_performance(25.0, 40.0, 0.9, 0.0);
        let degraded = *m.settings();
        assert_eq!(
            m.update_performance(120.0, 5.0, 0.1, 2500.0),
            Some(QualityAdjustment::Increased)
        );
        assert!(m.settings().particle_count > degraded.particle_count);
        assert!(m.in_cooldown(7000.0));
        assert!(!m.in_cooldown(7500.0));
    }

    #[test]
    fn test_no_step_up_at_target_fps() {
        let mut m = manager(Tier::Medium);
        m.update_performance(25.0, 40.0, 0.9, 0.0);
        assert!(m.update_performance(60.0, 5.0, 0.1, 2500.0).is_none());
    }

    #[test]
    fn test_step_up_bounded_by_tier() {
        let mut m = manager(Tier::Low);
        for i in 0..20 {
            m.update_performance(120.0, 5.0, 0.1, i as f64 * 6000.0);
        }
        let limits = Tier::Low.limits();
        assert!(m.settings().particle_count <= limits.max_particles);
        assert!(!m.settings().post_processing);
    }

    #[test]
    fn test_set_tier_revalidates() {
        let mut m = manager(Tier::Ultra);
        m.set_tier(Tier::Low);
        assert_eq!(m.tier(), Tier::Low);
        assert!(m.settings().particle_count <= Tier::Low.limits().max_particles);
        assert!(!m.settings().reflections);
    }

    #[test]
    fn test_set_tier_capped_by_device() {
        let mut m = manager(Tier::Medium);
        m.set_tier(Tier::Ultra);
        assert_eq!(m.tier(), Tier::Medium);
    }

    #[test]
    fn test_reset_to_recommended() {
        let mut m = manager(Tier::High);
        m.update_performance(25.0, 40.0, 0.9, 0.0);
        m.reset_to_recommended();
        assert_eq!(*m.settings(), QualitySettings::recommended(Tier::High));
        assert!(!m.in_cooldown(0.0));
    }

    #[test]
    fn test_histories_are_bounded() {
        let mut m = manager(Tier::High);
        for i in 0..100 {
            m.update_performance(i as f32, 16.0, 0.5, 0.0);
        }
        // last 60 values are 40..100
        assert!((m.average_fps().unwrap() - 69.5).abs() < 1e-3);
        assert!((m.average_memory().unwrap() - 0.5).abs() < 1e-6);
    }
}
