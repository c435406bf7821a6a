//! Quality tiers and fine-grained quality settings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest render resolution scale
pub const MIN_RESOLUTION: f32 = 0.5;
/// Highest render resolution scale
pub const MAX_RESOLUTION: f32 = 1.0;
/// Fewest particles ever simulated
pub const MIN_PARTICLES: u32 = 1000;
/// Lowest effect complexity
pub const MIN_EFFECT_COMPLEXITY: f32 = 0.3;
/// Highest effect complexity
pub const MAX_EFFECT_COMPLEXITY: f32 = 1.0;
/// Lowest simulation update rate (Hz)
pub const MIN_UPDATE_RATE: u32 = 30;
/// Smallest draw-call budget
pub const MIN_DRAW_CALLS: u32 = 50;
/// Smallest triangle budget
pub const MIN_TRIANGLES: u32 = 10_000;

/// Coarse device/quality classification, totally ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Weakest devices
    Low,
    /// Mid-range devices
    #[default]
    Medium,
    /// Capable desktops and flagship phones
    High,
    /// Dedicated GPUs
    Ultra,
}

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 4] = [Tier::Low, Tier::Medium, Tier::High, Tier::Ultra];

    /// Position in [`Tier::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next tier up, if any
    pub fn step_up(self) -> Option<Tier> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Next tier down, if any
    pub fn step_down(self) -> Option<Tier> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Per-tier ceilings
    pub fn limits(self) -> TierLimits {
        TIER_LIMITS[self.index()]
    }

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
            Tier::Ultra => "ultra",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered texture quality levels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TextureQuality {
    /// Quarter-size textures
    Low,
    /// Half-size textures
    #[default]
    Medium,
    /// Full-size textures
    High,
    /// Full-size textures with extra precision
    Ultra,
}

impl TextureQuality {
    const ORDER: [TextureQuality; 4] = [
        TextureQuality::Low,
        TextureQuality::Medium,
        TextureQuality::High,
        TextureQuality::Ultra,
    ];

    /// One step lower, saturating
    pub fn lower(self) -> Self {
        let i = self as usize;
        Self::ORDER[i.saturating_sub(1)]
    }

    /// One step higher, saturating
    pub fn higher(self) -> Self {
        let i = self as usize;
        Self::ORDER[(i + 1).min(Self::ORDER.len() - 1)]
    }
}

/// Ceilings of the quality dimensions for one tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierLimits {
    /// Maximum particle count
    pub max_particles: u32,
    /// Maximum update rate (Hz)
    pub max_update_rate: u32,
    /// Maximum draw calls per frame
    pub max_draw_calls: u32,
    /// Maximum triangles per frame
    pub max_triangles: u32,
    /// Best texture quality
    pub max_texture: TextureQuality,
    /// Whether post-processing, shadows and reflections may be enabled
    pub premium_effects: bool,
}

const TIER_LIMITS: [TierLimits; 4] = [
    TierLimits {
        max_particles: 5_000,
        max_update_rate: 30,
        max_draw_calls: 200,
        max_triangles: 50_000,
        max_texture: TextureQuality::Low,
        premium_effects: false,
    },
    TierLimits {
        max_particles: 15_000,
        max_update_rate: 45,
        max_draw_calls: 500,
        max_triangles: 150_000,
        max_texture: TextureQuality::Medium,
        premium_effects: false,
    },
    TierLimits {
        max_particles: 30_000,
        max_update_rate: 60,
        max_draw_calls: 1_000,
        max_triangles: 500_000,
        max_texture: TextureQuality::High,
        premium_effects: true,
    },
    TierLimits {
        max_particles: 50_000,
        max_update_rate: 60,
        max_draw_calls: 2_000,
        max_triangles: 1_000_000,
        max_texture: TextureQuality::Ultra,
        premium_effects: true,
    },
];

/// Fine-grained render quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Render resolution scale (0.5 - 1.0)
    pub resolution: f32,
    /// Simulated particle count
    pub particle_count: u32,
    /// Texture quality
    pub texture_quality: TextureQuality,
    /// Effect complexity (0.3 - 1.0)
    pub effect_complexity: f32,
    /// Simulation update rate (Hz)
    pub update_rate: u32,
    /// Post-processing pass enabled
    pub post_processing: bool,
    /// Shadows enabled
    pub shadows: bool,
    /// Reflections enabled
    pub reflections: bool,
    /// Draw-call budget
    pub max_draw_calls: u32,
    /// Triangle budget
    pub max_triangles: u32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::recommended(Tier::default())
    }
}

impl QualitySettings {
    /// Recommended starting point for a tier
    pub fn recommended(tier: Tier) -> Self {
        match tier {
            Tier::Low => Self {
                resolution: 0.75,
                particle_count: 3_000,
                texture_quality: TextureQuality::Low,
                effect_complexity: 0.5,
                update_rate: 30,
                post_processing: false,
                shadows: false,
                reflections: false,
                max_draw_calls: 150,
                max_triangles: 40_000,
            },
            Tier::Medium => Self {
                resolution: 0.85,
                particle_count: 8_000,
                texture_quality: TextureQuality::Medium,
                effect_complexity: 0.7,
                update_rate: 45,
                post_processing: false,
                shadows: false,
                reflections: false,
                max_draw_calls: 400,
                max_triangles: 120_000,
            },
            Tier::High => Self {
                resolution: 1.0,
                particle_count: 20_000,
                texture_quality: TextureQuality::High,
                effect_complexity: 0.85,
                update_rate: 60,
                post_processing: true,
                shadows: true,
                reflections: false,
                max_draw_calls: 800,
                max_triangles: 400_000,
            },
            Tier::Ultra => Self {
                resolution: 1.0,
                particle_count: 40_000,
                texture_quality: TextureQuality::Ultra,
                effect_complexity: 1.0,
                update_rate: 60,
                post_processing: true,
                shadows: true,
                reflections: true,
                max_draw_calls: 1_500,
                max_triangles: 800_000,
            },
        }
    }

    /// Copy clamped to the floors and to the ceilings of `tier`
    pub fn validated(&self, tier: Tier) -> Self {
        let limits = tier.limits();
        let premium = limits.premium_effects;
        Self {
            resolution: clamp_f32(self.resolution, MIN_RESOLUTION, MAX_RESOLUTION),
            particle_count: self.particle_count.clamp(MIN_PARTICLES, limits.max_particles),
            texture_quality: self.texture_quality.min(limits.max_texture),
            effect_complexity: clamp_f32(
                self.effect_complexity,
                MIN_EFFECT_COMPLEXITY,
                MAX_EFFECT_COMPLEXITY,
            ),
            update_rate: self.update_rate.clamp(MIN_UPDATE_RATE, limits.max_update_rate),
            post_processing: self.post_processing && premium,
            shadows: self.shadows && premium,
            reflections: self.reflections && premium,
            max_draw_calls: self.max_draw_calls.clamp(MIN_DRAW_CALLS, limits.max_draw_calls),
            max_triangles: self.max_triangles.clamp(MIN_TRIANGLES, limits.max_triangles),
        }
    }

    /// Every dimension one notch down
    pub fn stepped_down(&self, tier: Tier) -> Self {
        Self {
            resolution: self.resolution - 0.1,
            particle_count: scale_u32(self.particle_count, 0.8),
            texture_quality: self.texture_quality.lower(),
            effect_complexity: self.effect_complexity - 0.1,
            update_rate: self.update_rate.saturating_sub(10),
            post_processing: false,
            shadows: false,
            reflections: false,
            max_draw_calls: scale_u32(self.max_draw_calls, 0.8),
            max_triangles: scale_u32(self.max_triangles, 0.8),
        }
        .validated(tier)
    }

    /// Every dimension one notch up, bounded by the tier's ceilings
    pub fn stepped_up(&self, tier: Tier) -> Self {
        let premium = tier.limits().premium_effects;
        Self {
            resolution: self.resolution + 0.1,
            particle_count: scale_u32(self.particle_count, 1.2),
            texture_quality: self.texture_quality.higher(),
            effect_complexity: self.effect_complexity + 0.1,
            update_rate: self.update_rate.saturating_add(10),
            post_processing: premium,
            shadows: premium,
            reflections: premium,
            max_draw_calls: scale_u32(self.max_draw_calls, 1.2),
            max_triangles: scale_u32(self.max_triangles, 1.2),
        }
        .validated(tier)
    }
}

fn clamp_f32(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

fn scale_u32(value: u32, factor: f32) -> u32 {
    (value as f32 * factor).round() as u32
}
