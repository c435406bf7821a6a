//! Sustained-condition tier switching with hysteresis

use super::quality::Tier;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for [`TierTransitionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTransitionConfig {
    /// fps below this counts toward a step down
    pub step_down_fps: f32,
    /// fps above this counts toward a step up
    pub step_up_fps: f32,
    /// How long fps must stay low before stepping down (ms)
    pub step_down_sustain_ms: f64,
    /// How long fps must stay high before stepping up (ms)
    pub step_up_sustain_ms: f64,
    /// Minimum time between two step downs (ms)
    pub step_down_cooldown_ms: f64,
}

impl Default for TierTransitionConfig {
    fn default() -> Self {
        Self {
            step_down_fps: 25.0,
            step_up_fps: 50.0,
            step_down_sustain_ms: 2000.0,
            step_up_sustain_ms: 3000.0,
            step_down_cooldown_ms: 5000.0,
        }
    }
}

impl TierTransitionConfig {
    /// Check that the thresholds leave a hysteresis band
    pub fn validate(&self) -> Result<()> {
        if self.step_down_fps >= self.step_up_fps {
            return Err(CoreError::InvalidConfig(format!(
                "step_down_fps ({}) must be below step_up_fps ({})",
                self.step_down_fps, self.step_up_fps
            )));
        }
        if self.step_down_sustain_ms < 0.0
            || self.step_up_sustain_ms < 0.0
            || self.step_down_cooldown_ms < 0.0
        {
            return Err(CoreError::InvalidConfig(
                "tier transition durations must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Moves the engine one tier at a time on sustained fps conditions
#[derive(Debug, Clone, Default)]
pub struct TierTransitionManager {
    config: TierTransitionConfig,
    below_start: Option<f64>,
    above_start: Option<f64>,
    last_step_down: Option<f64>,
}

impl TierTransitionManager {
    /// Create a manager with no running timers
    pub fn new(config: TierTransitionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Feed one fps reading. Returns the new tier when a transition fires.
    pub fn check_and_transition(
        &mut self,
        fps: f32,
        current: Tier,
        max_tier: Tier,
        now: f64,
    ) -> Option<Tier> {
        if current > max_tier {
            self.clear_trackers();
            let next = current.step_down();
            if let Some(next) = next {
                info!("Tier {} above device maximum {}, stepping to {}", current, max_tier, next);
            }
            return next;
        }

        // NaN fails both comparisons and clears both trackers
        if fps < self.config.step_down_fps {
            self.below_start.get_or_insert(now);
        } else {
            self.below_start = None;
        }
        if fps > self.config.step_up_fps {
            self.above_start.get_or_insert(now);
        } else {
            self.above_start = None;
        }

        if let Some(start) = self.below_start {
            let sustained = now - start >= self.config.step_down_sustain_ms;
            let cooled = self
                .last_step_down
                .map_or(true, |last| now - last >= self.config.step_down_cooldown_ms);
            if sustained && cooled {
                if let Some(next) = current.step_down() {
                    self.last_step_down = Some(now);
                    self.clear_trackers();
                    info!("Tier step down {} -> {} (fps {:.1})", current, next, fps);
                    return Some(next);
                }
            }
        }

        if let Some(start) = self.above_start {
            if now - start >= self.config.step_up_sustain_ms && current < max_tier {
                if let Some(next) = current.step_up() {
                    self.clear_trackers();
                    info!("Tier step up {} -> {} (fps {:.1})", current, next, fps);
                    return Some(next);
                }
            }
        }

        None
    }

    fn clear_trackers(&mut self) {
        self.below_start = None;
        self.above_start = None;
    }

    /// Clear every timer
    pub fn reset(&mut self) {
        self.clear_trackers();
        self.last_step_down = None;
        debug!("TierTransitionManager reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        manager: &mut TierTransitionManager,
        fps: f32,
        tier: &mut Tier,
        max_tier: Tier,
        from: f64,
        to: f64,
    ) -> Vec<Tier> {
        let mut transitions = Vec::new();
        let mut now = from;
        while now <= to {
            if let Some(next) = manager.check_and_transition(fps, *tier, max_tier, now) {
                *tier = next;
                transitions.push(next);
            }
            now += 100.0;
        }
        transitions
    }

    #[test]
    fn test_sustained_low_fps_steps_down_once() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::High;
        let transitions = run(&mut manager, 10.0, &mut tier, Tier::Ultra, 0.0, 2500.0);
        assert_eq!(transitions, vec![Tier::Medium]);
    }

    #[test]
    fn test_short_dip_is_ignored() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::High;
        let transitions = run(&mut manager, 10.0, &mut tier, Tier::Ultra, 0.0, 1000.0);
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_sustained_high_fps_steps_up_once() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::Low;
        let transitions = run(&mut manager, 60.0, &mut tier, Tier::High, 0.0, 3500.0);
        assert_eq!(transitions, vec![Tier::Medium]);
    }

    #[test]
    fn test_step_up_capped_by_max_tier() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::Medium;
        let transitions = run(&mut manager, 60.0, &mut tier, Tier::Medium, 0.0, 10_000.0);
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_step_down_cooldown() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::Ultra;
        // 2000ms sustain, then 5000ms cooldown before the second step
        let transitions = run(&mut manager, 10.0, &mut tier, Tier::Ultra, 0.0, 6900.0);
        assert_eq!(transitions, vec![Tier::High]);
        let transitions = run(&mut manager, 10.0, &mut tier, Tier::Ultra, 7000.0, 7000.0);
        assert_eq!(transitions, vec![Tier::Medium]);
    }

    #[test]
    fn test_interrupted_condition_restarts_timer() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::High;
        assert!(run(&mut manager, 10.0, &mut tier, Tier::Ultra, 0.0, 1500.0).is_empty());
        assert!(run(&mut manager, 40.0, &mut tier, Tier::Ultra, 1600.0, 1600.0).is_empty());
        assert!(run(&mut manager, 10.0, &mut tier, Tier::Ultra, 1700.0, 3600.0).is_empty());
        assert_eq!(
            run(&mut manager, 10.0, &mut tier, Tier::Ultra, 3700.0, 3700.0),
            vec![Tier::Medium]
        );
    }

    #[test]
    fn test_above_max_tier_steps_down_immediately() {
        let mut manager = TierTransitionManager::default();
        assert_eq!(
            manager.check_and_transition(60.0, Tier::Ultra, Tier::Medium, 0.0),
            Some(Tier::High)
        );
    }

    #[test]
    fn test_lowest_tier_cannot_step_down() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::Low;
        assert!(run(&mut manager, 5.0, &mut tier, Tier::Ultra, 0.0, 10_000.0).is_empty());
    }

    #[test]
    fn test_reset_clears_cooldown() {
        let mut manager = TierTransitionManager::default();
        let mut tier = Tier::Ultra;
        run(&mut manager, 10.0, &mut tier, Tier::Ultra, 0.0, 2000.0);
        assert_eq!(tier, Tier::High);
        manager.reset();
        let transitions = run(&mut manager, 10.0, &mut tier, Tier::Ultra, 2100.0, 4100.0);
        assert_eq!(transitions, vec![Tier::Medium]);
    }
}
