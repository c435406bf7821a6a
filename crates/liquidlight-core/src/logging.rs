//! Logging configuration
//!
//! The subscriber itself is installed by the host binary; this module only
//! describes where and how verbosely to log and manages the log directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Prefix of every log file name
pub const LOG_FILE_PREFIX: &str = "liquidlight_";
/// Extension of every log file name
pub const LOG_FILE_EXTENSION: &str = "log";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: trace, debug, info, warn, error or off
    pub level: String,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a file in `log_dir`
    pub file_output: bool,
    /// Directory holding log files
    pub log_dir: PathBuf,
    /// Log files kept on startup; older ones are deleted
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: true,
            log_dir: PathBuf::from("logs"),
            max_log_files: 10,
        }
    }
}

impl LogConfig {
    /// Parsed level, INFO when the name is not recognized
    pub fn parse_level(&self) -> LevelFilter {
        self.level
            .trim()
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::INFO)
    }

    /// Create the log directory if file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Path of a log file for a session starting now
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.log_dir
            .join(format!("{}{}.{}", LOG_FILE_PREFIX, stamp, LOG_FILE_EXTENSION))
    }

    /// Delete the oldest log files so that at most `max_log_files - 1`
    /// remain, leaving room for the new session. Returns how many were removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.file_output || !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().map_or(false, |ext| ext == LOG_FILE_EXTENSION)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map_or(false, |name| name.starts_with(LOG_FILE_PREFIX))
            })
            .collect();

        let keep = self.max_log_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - keep;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}
