//! Settings schema definitions.
//!
//! All types derive Serde traits for deserialization from settings files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings of the rewriter service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RewriterSettings {
    /// Where processor configurations are read from.
    pub store: StoreSettings,

    /// Change detection on the store directories.
    pub watcher: WatcherSettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Content store location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory the store paths are resolved against.
    pub base_dir: PathBuf,

    /// Configuration roots, highest priority first.
    pub search_paths: Vec<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            search_paths: vec!["/apps".to_string(), "/libs".to_string()],
        }
    }
}

/// File-system watcher settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub enabled: bool,

    /// Poll interval for backends without native notifications.
    pub poll_interval_secs: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 2,
        }
    }
}

impl WatcherSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for this crate's targets (trace, debug, info, warn, error).
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
