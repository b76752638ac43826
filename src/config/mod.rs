//! Configuration management for initr
//!
//! Handles loading loader options, logging, resolver settings and the
//! declarative dependency list from TOML or JSON files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::module::console::LogLevel;
use crate::module::registry::descriptor::Dependency;
use crate::utils::{env_bool, env_opt};

/// Environment override for `dev_mode`
pub const ENV_DEV: &str = "INITR_DEV";

/// Environment override for `scope`
pub const ENV_SCOPE: &str = "INITR_SCOPE";

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter (e.g. "info", "initr=debug"); RUST_LOG wins
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,

    /// Threshold for the per-instance console
    #[serde(default)]
    pub level: LogLevel,
}

/// Source resolver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-reference resolution timeout in milliseconds (none by default)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Reference aliases applied before lookup
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// Root prefixed to relative references (e.g. "javascript/")
    #[serde(default)]
    pub base_path: Option<String>,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitrConfig {
    /// Scope selector; the whole document when absent
    #[serde(default)]
    pub scope: Option<String>,

    /// Verbose console output regardless of `logging.level`
    #[serde(default)]
    pub dev_mode: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Declarative dependencies (callbacks are code-only)
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl InitrConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InitrConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InitrConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    ///
    /// `.json` is read as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        debug!("Loading configuration from {:?}", path);
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_toml_file(path)
        }
    }

    /// Save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `INITR_DEV` and `INITR_SCOPE` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dev) = env_bool(ENV_DEV) {
            self.dev_mode = dev;
        }
        if let Some(scope) = env_opt(ENV_SCOPE) {
            self.scope = Some(scope);
        }
        self
    }

    /// Effective console threshold
    pub fn log_level(&self) -> LogLevel {
        if self.dev_mode {
            LogLevel::Debug
        } else {
            self.logging.level
        }
    }
}
