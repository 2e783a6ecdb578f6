//! TOML-based configuration for the merge engine.
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`MergeConfig::default`]) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Merge-data assembly settings.
    #[serde(default)]
    pub merge: MergeSettings,
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

/// Process-wide settings.
///
/// The library emits `tracing` events but never installs a subscriber; the
/// embedding application reads [`GeneralConfig::level`] when it builds one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl GeneralConfig {
    /// The configured minimum level, for the embedding application's
    /// subscriber.
    pub fn level(&self) -> Result<Level, ConfigError> {
        let level = self.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".into(),
                detail: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        level.parse::<Level>().map_err(|e| ConfigError::InvalidValue {
            field: "general.log_level".into(),
            detail: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Settings consumed by the working tree and merge preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Suffix of the pending-merge snapshot written beside a conflicted file.
    #[serde(default = "default_snapshot_suffix")]
    pub pending_snapshot_suffix: String,

    /// Number of leading bytes inspected when sniffing binary content.
    #[serde(default = "default_binary_probe_len")]
    pub binary_probe_len: usize,
}

fn default_snapshot_suffix() -> String {
    ".orig".into()
}
fn default_binary_probe_len() -> usize {
    8000
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            pending_snapshot_suffix: default_snapshot_suffix(),
            binary_probe_len: default_binary_probe_len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl MergeConfig {
    /// Load a [`MergeConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MergeConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.level()?;
        let suffix = &self.merge.pending_snapshot_suffix;
        if suffix.len() < 2 || !suffix.starts_with('.') {
            return Err(ConfigError::InvalidValue {
                field: "merge.pending_snapshot_suffix".into(),
                detail: "suffix must start with '.' and name an extension".into(),
            });
        }
        if suffix.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field: "merge.pending_snapshot_suffix".into(),
                detail: "suffix must not contain path separators".into(),
            });
        }
        if self.merge.binary_probe_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "merge.binary_probe_len".into(),
                detail: "probe length must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}
