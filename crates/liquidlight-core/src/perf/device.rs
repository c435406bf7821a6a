//! Device capability classification

use super::quality::{QualitySettings, Tier};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, info};

const BYTES_PER_GB: f32 = 1024.0 * 1024.0 * 1024.0;

/// Memory assumed when the host cannot report it (GB)
pub const DEFAULT_MEMORY_GB: f32 = 4.0;
/// Core count assumed when the host cannot report it
pub const DEFAULT_CPU_CORES: u32 = 4;
/// Texture size assumed when the host cannot report it
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 4096;

/// Raw capabilities reported by the host; unknown values stay `None`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCapabilities {
    /// Installed memory in GB
    pub device_memory_gb: Option<f32>,
    /// Logical CPU cores
    pub cpu_cores: Option<u32>,
    /// Largest supported texture dimension
    pub max_texture_size: Option<u32>,
    /// Battery-powered handheld
    pub is_mobile: bool,
}

impl DeviceCapabilities {
    /// Capabilities of the machine we are running on
    ///
    /// Memory and cores come from `sysinfo`; the texture limit is only known
    /// to the renderer and stays `None`.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let total_memory = sys.total_memory();
        let device_memory_gb = (total_memory > 0).then(|| total_memory as f32 / BYTES_PER_GB);
        let cpu_cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism()
                .ok()
                .map(|n| n.get() as u32),
            n => Some(n as u32),
        };

        debug!(
            "Detected {:?}GB memory and {:?} cores",
            device_memory_gb, cpu_cores
        );
        Self {
            device_memory_gb,
            cpu_cores,
            ..Default::default()
        }
    }

    /// Copy where every known field of `overrides` wins
    pub fn with_overrides(&self, overrides: &DeviceCapabilities) -> Self {
        Self {
            device_memory_gb: overrides.device_memory_gb.or(self.device_memory_gb),
            cpu_cores: overrides.cpu_cores.or(self.cpu_cores),
            max_texture_size: overrides.max_texture_size.or(self.max_texture_size),
            is_mobile: overrides.is_mobile || self.is_mobile,
        }
    }
}

/// Classified device with its starting quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Input capabilities
    pub capabilities: DeviceCapabilities,
    /// Highest tier this device may ever run
    pub max_tier: Tier,
    /// Tier to start at
    pub recommended_tier: Tier,
    /// Settings to start with
    pub recommended_settings: QualitySettings,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::classify(&DeviceCapabilities::default())
    }
}

impl DeviceProfile {
    /// Derive tiers and settings from capabilities
    pub fn classify(capabilities: &DeviceCapabilities) -> Self {
        let memory = capabilities
            .device_memory_gb
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB);
        let cores = capabilities
            .cpu_cores
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_CPU_CORES);
        let texture = capabilities
            .max_texture_size
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_MAX_TEXTURE_SIZE);

        let mut max_tier = if memory >= 8.0 && cores >= 8 && texture >= 8192 {
            Tier::Ultra
        } else if memory >= 4.0 && cores >= 4 {
            Tier::High
        } else if memory >= 2.0 && cores >= 2 {
            Tier::Medium
        } else {
            Tier::Low
        };
        if capabilities.is_mobile {
            max_tier = max_tier.min(Tier::High);
        }

        // Mobile devices start one tier below their ceiling
        let recommended_tier = if capabilities.is_mobile {
            max_tier.step_down().unwrap_or(max_tier)
        } else {
            max_tier
        };

        info!(
            "Device classified: memory={}GB cores={} texture={} mobile={} -> max={} recommended={}",
            memory, cores, texture, capabilities.is_mobile, max_tier, recommended_tier
        );

        Self {
            capabilities: *capabilities,
            max_tier,
            recommended_tier,
            recommended_settings: Self::recommended_settings(recommended_tier),
        }
    }

    /// Profile pinned to one tier
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            capabilities: DeviceCapabilities::default(),
            max_tier: tier,
            recommended_tier: tier,
            recommended_settings: Self::recommended_settings(tier),
        }
    }

    /// Recommended quality settings for a tier
    pub fn recommended_settings(tier: Tier) -> QualitySettings {
        QualitySettings::recommended(tier)
    }
}
