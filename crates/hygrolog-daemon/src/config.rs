//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server listen address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Sensor poll interval in seconds
    #[serde(default = "default_poll")]
    pub poll: u64,

    /// History flush interval in seconds
    #[serde(default = "default_flush")]
    pub flush: u64,

    /// Sensor configuration
    #[serde(default)]
    pub sensor: SensorConfig,

    /// History log configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Web UI configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Sensor executable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Path to the executable printing "temperature,humidity"
    #[serde(default = "default_sensor_path")]
    pub path: PathBuf,

    /// Kill the executable after this many seconds (0 = wait forever)
    #[serde(default = "default_sensor_timeout")]
    pub timeout: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            path: default_sensor_path(),
            timeout: default_sensor_timeout(),
        }
    }
}

/// History log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History log file
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// How far back history queries look, in seconds
    #[serde(default = "default_window")]
    pub window: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            window: default_window(),
        }
    }
}

/// Web UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Serve the web UI
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Directory served under /public
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_true(),
            public_dir: default_public_dir(),
        }
    }
}

// Default value functions
fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_poll() -> u64 {
    60
}

fn default_flush() -> u64 {
    600
}

fn default_sensor_path() -> PathBuf {
    PathBuf::from(hygrolog_core::DEFAULT_SENSOR_PATH)
}

fn default_sensor_timeout() -> u64 {
    30
}

fn default_log_path() -> PathBuf {
    PathBuf::from(hygrolog_core::DEFAULT_LOG_PATH)
}

fn default_window() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that all intervals are positive.
    pub fn validate(&self) -> Result<()> {
        if self.poll == 0 {
            bail!("poll interval must be positive");
        }
        if self.flush == 0 {
            bail!("flush interval must be positive");
        }
        if self.history.window == 0 {
            bail!("history window must be positive");
        }
        Ok(())
    }

    /// Sensor poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll)
    }

    /// History flush interval.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush)
    }

    /// Sensor timeout, if any.
    pub fn sensor_timeout(&self) -> Option<Duration> {
        (self.sensor.timeout > 0).then(|| Duration::from_secs(self.sensor.timeout))
    }

    /// History query window.
    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.history.window)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            poll: default_poll(),
            flush: default_flush(),
            sensor: SensorConfig::default(),
            history: HistoryConfig::default(),
            web: WebConfig::default(),
        }
    }
}
