//! TOML-based runtime configuration for the embedding host.
//!
//! The host decides where Subversion-style configuration lives. When it
//! manages configuration itself it sets `host_managed_config` and no
//! directory probing happens at all; otherwise an explicit directory wins
//! over the platform default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::types::Depth;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Runtime configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Changelist operation settings.
    #[serde(default)]
    pub changelist: ChangelistConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Explicit configuration directory. Overrides the platform default.
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// The embedding application supplies configuration itself; skip all
    /// directory probing.
    #[serde(default)]
    pub host_managed_config: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            config_dir: None,
            host_managed_config: false,
        }
    }
}

/// Changelist operation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelistConfig {
    /// Depth used when the caller does not specify one.
    #[serde(default = "default_depth")]
    pub default_depth: Depth,
}

fn default_depth() -> Depth {
    Depth::Infinity
}

impl Default for ChangelistConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl RuntimeConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.general.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "general.log_level".into(),
                    detail: format!("unknown level '{other}'"),
                })
            }
        }
        Ok(())
    }

    /// The configuration directory in effect, or `None` when the host
    /// manages configuration itself.
    pub fn effective_config_dir(&self) -> Option<PathBuf> {
        if self.general.host_managed_config {
            debug!("host-managed configuration; no config directory");
            return None;
        }
        self.general
            .config_dir
            .clone()
            .or_else(default_config_dir)
    }

    /// A starter configuration file.
    pub fn default_toml() -> String {
        let template = r#"[general]
# Minimum log level: trace, debug, info, warn, error.
log_level = "info"
# Explicit configuration directory (defaults to the platform location).
# config_dir = "/home/user/.subversion"
# Set when the embedding application supplies configuration itself.
host_managed_config = false

[changelist]
# Depth used when none is given: empty, files, immediates, infinity.
default_depth = "infinity"
"#;
        template.to_string()
    }
}

/// The platform-default configuration directory: `%APPDATA%\Subversion` on
/// Windows, `~/.subversion` elsewhere.
pub fn default_config_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        dirs::config_dir().map(|dir| dir.join("Subversion"))
    } else {
        dirs::home_dir().map(|dir| dir.join(".subversion"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert!(!config.general.host_managed_config);
        assert_eq!(config.changelist.default_depth, Depth::Infinity);
    }

    #[test]
    fn test_default_toml_parses_and_validates() {
        let config: RuntimeConfig = toml::from_str(&RuntimeConfig::default_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.changelist.default_depth, Depth::Infinity);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config: RuntimeConfig = toml::from_str("[general]\nlog_level = \"loud\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_host_managed_config_skips_probing() {
        let mut config = RuntimeConfig::default();
        config.general.host_managed_config = true;
        config.general.config_dir = Some(PathBuf::from("/somewhere"));
        assert_eq!(config.effective_config_dir(), None);
    }

    #[test]
    fn test_explicit_config_dir_wins() {
        let mut config = RuntimeConfig::default();
        config.general.config_dir = Some(PathBuf::from("/etc/wckit-svn"));
        assert_eq!(
            config.effective_config_dir(),
            Some(PathBuf::from("/etc/wckit-svn"))
        );
    }
}
