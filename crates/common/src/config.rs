//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Device control discovery and writes.
    pub controls: ControlsConfig,

    /// Preview pipeline settings.
    pub preview: PreviewConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings for the external control tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Control tool binary (`v4l2-ctl` compatible).
    pub tool: PathBuf,

    /// Delay between selecting a device and listing its controls.
    /// Device nodes are not always readable right after selection.
    pub discovery_delay_ms: u64,

    /// Upper bound on one control listing. A listing still running after
    /// this is killed and reported as a discovery failure.
    pub discovery_timeout_ms: u64,
}

/// Preview pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// GStreamer sink element factory name.
    pub video_sink: String,

    /// Initial orientation, e.g. `clockwise` or `horizontal-flip`.
    pub orientation: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lightbox=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("v4l2-ctl"),
            discovery_delay_ms: 2000,
            discovery_timeout_ms: 5000,
        }
    }
}

impl ControlsConfig {
    pub fn discovery_delay(&self) -> Duration {
        Duration::from_millis(self.discovery_delay_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            video_sink: "autovideosink".to_string(),
            orientation: "none".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("lightbox").join("config.json")
}
