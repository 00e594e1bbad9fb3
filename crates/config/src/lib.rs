//! Configuration loading and validation for MicroClaw.
//!
//! Loads configuration from `~/.microclaw/config.toml` with environment
//! variable overrides. A missing file means defaults.

use microclaw_core::agent::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.microclaw/config.toml`:
///
/// ```toml
/// [agent]
/// max_steps = 10
/// strict = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Load configuration from the default path (~/.microclaw/config.toml),
    /// then apply environment overrides:
    /// - `MICROCLAW_MAX_STEPS`
    /// - `MICROCLAW_STRICT`
    /// - `MICROCLAW_DEBUG`
    /// - `MICROCLAW_TRACING`
    /// - `MICROCLAW_MAX_MESSAGES`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let agent = &mut self.agent;

        if let Some(value) = lookup("MICROCLAW_MAX_STEPS") {
            agent.max_steps = parse_env("MICROCLAW_MAX_STEPS", &value)?;
        }
        if let Some(value) = lookup("MICROCLAW_STRICT") {
            agent.strict = parse_flag("MICROCLAW_STRICT", &value)?;
        }
        if let Some(value) = lookup("MICROCLAW_DEBUG") {
            agent.debug = parse_flag("MICROCLAW_DEBUG", &value)?;
        }
        if let Some(value) = lookup("MICROCLAW_TRACING") {
            agent.enable_tracing = parse_flag("MICROCLAW_TRACING", &value)?;
        }
        if let Some(value) = lookup("MICROCLAW_MAX_MESSAGES") {
            agent.max_messages = match value.trim() {
                "" | "none" => None,
                v => Some(parse_env("MICROCLAW_MAX_MESSAGES", v)?),
            };
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".microclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.max_messages == Some(0) {
            return Err(ConfigError::ValidationError(
                "agent.max_messages must be at least 1 when set".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("{key}={value:?}: {e}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{key}={value:?}: expected a boolean"
        ))),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
