//! Configuration management utilities
//!
//! Everything that depends on the process environment (endpoints, keys,
//! limits) is read here once at startup and handed down explicitly. Nothing
//! below the binaries reads environment variables.

use crate::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing configuration value: {0}")]
    Missing(String),

    /// A setting is present but unusable
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid {
        /// Name of the offending setting
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Settings for the model endpoint collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible endpoint (or an Azure deployment URL)
    pub api_base: String,
    /// API key; may be empty for local endpoints
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Model or deployment name
    pub model: String,
    /// Azure OpenAI `api-version`, when talking to Azure
    pub api_version: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (dev, prod, etc.)
    pub environment: String,
    /// Model endpoint settings
    pub model: ModelSettings,
    /// Cap on model round-trips inside one agent turn
    pub max_tool_iterations: usize,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "portfolio-agents".to_string(),
            environment: "development".to_string(),
            model: ModelSettings::default(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Unset keys fall back to defaults. Used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs = match lookup("MODEL_TIMEOUT_SECS") {
            Some(raw) => parse_number("MODEL_TIMEOUT_SECS", &raw)?,
            None => defaults.model.timeout_secs,
        };
        let max_tool_iterations = match lookup("MAX_TOOL_ITERATIONS") {
            Some(raw) => parse_number("MAX_TOOL_ITERATIONS", &raw)?,
            None => defaults.max_tool_iterations,
        };
        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        let config = Self {
            app_name: defaults.app_name,
            environment: lookup("APP_ENV").unwrap_or(defaults.environment),
            model: ModelSettings {
                api_base: lookup("OPENAI_API_BASE").unwrap_or(defaults.model.api_base),
                api_key: lookup("OPENAI_API_KEY").unwrap_or_default(),
                model: lookup("OPENAI_MODEL").unwrap_or(defaults.model.model),
                api_version: lookup("AZURE_OPENAI_API_VERSION"),
                timeout_secs,
            },
            max_tool_iterations,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::Missing("OPENAI_MODEL".to_string()));
        }
        if self.model.api_base.trim().is_empty() {
            return Err(ConfigError::Missing("OPENAI_API_BASE".to_string()));
        }
        if self.max_tool_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_TOOL_ITERATIONS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "MODEL_TIMEOUT_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
