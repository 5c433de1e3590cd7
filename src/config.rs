//! # Configuration Management
//!
//! Centralized configuration for the extension core and the units built on it.
//!
//! ## Configuration Sources
//! - TOML files via [`ServerConfig::from_file`]
//! - Direct instantiation with defaults
//! - Environment overrides via [`ServerConfig::from_env`]:
//!   `CHATD_PERSIST_PATH`, `CHATD_AUTOJOIN_CHANNELS`, `CHATD_AUTOJOIN_DELAY_SECS`
//!
//! Log filtering can additionally be overridden at runtime with `CHATD_LOG`
//! (see [`crate::utils::logging`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{ExtError, Result};
use crate::persist::DumpEncoding;
use crate::utils::compression::CompressionKind;

/// Largest dump accepted from disk, compressed or not (16 MB)
pub const MAX_DUMP_SIZE: usize = 16 * 1024 * 1024;

/// Longest autojoin delay
pub const MAX_AUTOJOIN_DELAY: Duration = Duration::from_secs(15 * 60);

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub persist: PersistConfig,

    #[serde(default)]
    pub autojoin: AutojoinConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// [`ExtError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ExtError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// # Errors
    /// [`ExtError::ConfigError`] on invalid TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ExtError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by environment variables
    ///
    /// # Errors
    /// [`ExtError::ConfigError`] if `CHATD_AUTOJOIN_DELAY_SECS` is not a number.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CHATD_PERSIST_PATH") {
            config.persist.path = PathBuf::from(path);
        }

        if let Ok(channels) = std::env::var("CHATD_AUTOJOIN_CHANNELS") {
            config.autojoin.channels = channels
                .split(',')
                .map(str::trim)
                .filter(|chan| !chan.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(delay) = std::env::var("CHATD_AUTOJOIN_DELAY_SECS") {
            let secs = delay.trim().parse::<u64>().map_err(|e| {
                ExtError::ConfigError(format!("Invalid CHATD_AUTOJOIN_DELAY_SECS '{delay}': {e}"))
            })?;
            config.autojoin.delay = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// # Errors
    /// [`ExtError::ConfigError`] if the config cannot be serialized or written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExtError::ConfigError(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| ExtError::ConfigError(format!("Failed to write config file: {e}")))
    }

    /// Every problem found, empty when the configuration is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.persist.validate();
        errors.extend(self.autojoin.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// # Errors
    /// [`ExtError::ConfigError`] listing every validation failure.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ExtError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Where and how extension metadata is persisted
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistConfig {
    /// Dump file
    pub path: PathBuf,

    #[serde(default)]
    pub encoding: DumpEncoding,

    /// Compress dumps with this algorithm when worthwhile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionKind>,

    /// Dumps smaller than this are never compressed
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold_bytes: usize,
}

fn default_compression_threshold() -> usize {
    4096
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/extensions.db"),
            encoding: DumpEncoding::default(),
            compression: None,
            compression_threshold_bytes: default_compression_threshold(),
        }
    }
}

impl PersistConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push("Persist path cannot be empty".to_string());
        } else if self.path.is_dir() {
            errors.push(format!("Persist path is a directory: {}", self.path.display()));
        }

        if self.compression.is_some() && self.compression_threshold_bytes > MAX_DUMP_SIZE {
            errors.push("Compression threshold cannot be larger than the maximum dump size".into());
        }

        errors
    }
}

/// Channels joined automatically after connecting
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AutojoinConfig {
    #[serde(default)]
    pub channels: Vec<String>,

    /// Wait this long before joining; zero joins immediately
    #[serde(with = "duration_serde", default)]
    pub delay: Duration,
}

impl AutojoinConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for chan in &self.channels {
            if !chan.starts_with('#') || chan.len() < 2 {
                errors.push(format!("Invalid autojoin channel name: '{chan}'"));
            } else if chan.contains(|c: char| c == ',' || c == ' ' || c == '\0') {
                errors.push(format!("Autojoin channel name contains a separator: '{chan}'"));
            }
        }

        if self.delay > MAX_AUTOJOIN_DELAY {
            errors.push(format!(
                "Autojoin delay too long: {}s (maximum: {}s)",
                self.delay.as_secs(),
                MAX_AUTOJOIN_DELAY.as_secs()
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("chatd"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Durations as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// `tracing::Level` as its lowercase name
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let name = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        name.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Level::from_str(&name)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {name}")))
    }
}
