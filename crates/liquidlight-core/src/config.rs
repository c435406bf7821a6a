//! Engine configuration
//!
//! Everything tunable at startup, stored as JSON in the user's config
//! directory (`LiquidLight/engine.json`).

use crate::audio::AudioReactiveConfig;
use crate::logging::LogConfig;
use crate::perf::{DeviceCapabilities, PerformanceConfig};
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// GPU resource pool settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePoolConfig {
    /// Memory budget shared by all pools (bytes)
    pub memory_budget_bytes: u64,
    /// Usage fraction above which idle resources are destroyed
    pub cleanup_threshold: f32,
    /// Interval of the memory monitor (ms)
    pub monitor_interval_ms: u64,
}

impl Default for ResourcePoolConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 512 * 1024 * 1024,
            cleanup_threshold: 0.8,
            monitor_interval_ms: 1000,
        }
    }
}

impl ResourcePoolConfig {
    /// Check the budget and threshold
    pub fn validate(&self) -> Result<()> {
        if self.memory_budget_bytes == 0 {
            return Err(CoreError::InvalidConfig(
                "memory_budget_bytes must be positive".to_string(),
            ));
        }
        if !(self.cleanup_threshold > 0.0 && self.cleanup_threshold <= 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "cleanup_threshold must be in (0, 1], got {}",
                self.cleanup_threshold
            )));
        }
        if self.monitor_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "monitor_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Audio-reactive chain
    pub audio: AudioReactiveConfig,
    /// Performance control
    pub performance: PerformanceConfig,
    /// GPU resource pooling
    pub resource_pool: ResourcePoolConfig,
    /// Logging
    pub logging: LogConfig,
    /// Capability overrides for hosts that cannot probe the device
    pub device: DeviceCapabilities,
}

impl EngineConfig {
    /// Default location: `<config dir>/LiquidLight/engine.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("LiquidLight");
            p.push("engine.json");
            p
        })
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!("Loaded engine configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file is missing or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring configuration at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.performance.validate()?;
        self.resource_pool.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "audio": { "smoothing_alpha": 0.5 } }"#).unwrap();
        assert_eq!(config.audio.smoothing_alpha, 0.5);
        assert_eq!(config.audio.energy_scale, 100.0);
        assert_eq!(config.resource_pool, ResourcePoolConfig::default());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = EngineConfig {
            resource_pool: ResourcePoolConfig {
                cleanup_threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(Some(&tmp.path().join("none.json")));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("engine.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(CoreError::Serialization(_))
        ));
        assert_eq!(EngineConfig::load_or_default(Some(&path)), EngineConfig::default());
    }
}
