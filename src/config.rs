//! Configuration for reframing sessions
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration:
//!
//! ```rust
//! use speechframe::Config;
//!
//! let config = Config::from_yaml_str("reframer:\n  index_window: 0.5\n").unwrap();
//! assert_eq!(config.reframer.index_window, 0.5);
//! assert_eq!(config.file.block_size, 5000);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::format::PROBE_LEN;
use crate::{ReframeError, Result};

/// Default read size for file and pipe sources.
pub const DEFAULT_BLOCK_SIZE: usize = 5000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reframer: ReframerConfig,
    pub file: FileConfig,
    pub pipe: PipeConfig,
    pub driver: DriverConfig,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(&path)
            .map_err(|e| ReframeError::source_error(path.as_ref().to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.reframer.validate()?;
        if self.file.block_size == 0 {
            return Err(ReframeError::config_error("file.block_size", "must be at least 1"));
        }
        if self.pipe.block_size == 0 {
            return Err(ReframeError::config_error("pipe.block_size", "must be at least 1"));
        }
        if self.driver.channel_capacity == 0 {
            return Err(ReframeError::config_error("driver.channel_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

/// Reframer behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReframerConfig {
    /// Seek index granularity in seconds
    pub index_window: f64,

    /// External time scale for frame timestamps; overrides the source's
    pub timescale: Option<u32>,

    /// Bytes gathered before running format detection
    pub probe_len: usize,
}

impl Default for ReframerConfig {
    fn default() -> Self {
        Self { index_window: 1.0, timescale: None, probe_len: PROBE_LEN }
    }
}

impl ReframerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.index_window > 0.0 && self.index_window.is_finite()) {
            return Err(ReframeError::config_error(
                "reframer.index_window",
                format!("must be a positive number of seconds, got {}", self.index_window),
            ));
        }
        if self.timescale == Some(0) {
            return Err(ReframeError::config_error("reframer.timescale", "must not be 0"));
        }
        if self.probe_len < PROBE_LEN {
            return Err(ReframeError::config_error(
                "reframer.probe_len",
                format!("must be at least {} bytes", PROBE_LEN),
            ));
        }
        Ok(())
    }
}

/// Regular file input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub block_size: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE }
    }
}

/// Named pipe input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    pub block_size: usize,

    /// Open the pipe in blocking mode
    pub blocking: bool,

    /// Never report end of stream when the writer closes; keep polling instead
    pub keep_open: bool,

    /// Create the FIFO when missing and remove it when the source is dropped
    pub create: bool,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE, blocking: true, keep_open: false, create: false }
    }
}

/// Async driver behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Frames buffered between the driver and the consumer
    pub channel_capacity: usize,

    /// Wait between polls of a source with no data ready
    pub poll_interval_ms: u64,

    /// How long opening a connection waits for format detection
    pub open_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { channel_capacity: 32, poll_interval_ms: 10, open_timeout_ms: 5000 }
    }
}

impl DriverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}
