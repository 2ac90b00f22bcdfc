//! Configuration for the portfolio agents and their tools

use crate::error::{PortfolioError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default endpoint of the web search API
pub const DEFAULT_SEARCH_API_BASE: &str = "https://api.tavily.com/search";

/// Configuration for portfolio agents and market data tools
///
/// Model settings left as `None` fall back to the defaults of the
/// [`AgentRuntime`](agent_runtime::AgentRuntime) the agents are built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Model override for the portfolio agents
    pub model: Option<String>,

    /// Max tokens override
    pub max_tokens: Option<usize>,

    /// Sampling temperature override
    pub temperature: Option<f32>,

    /// Tool loop cap override
    pub max_tool_iterations: Option<usize>,

    /// How long a fetched quote is reused
    pub quote_cache_ttl: Duration,

    /// Timeout for outbound HTTP requests
    pub request_timeout: Duration,

    /// Web search endpoint
    pub search_api_base: String,

    /// Web search API key; web search reports an error to the model without it
    #[serde(default, skip_serializing)]
    pub search_api_key: Option<String>,

    /// Results returned by a search when the model does not ask for a count
    pub search_max_results: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: None,
            temperature: None,
            max_tool_iterations: None,
            quote_cache_ttl: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            search_api_base: DEFAULT_SEARCH_API_BASE.to_string(),
            search_api_key: None,
            search_max_results: 5,
        }
    }
}

impl PortfolioConfig {
    /// Create a new configuration builder
    pub fn builder() -> PortfolioConfigBuilder {
        PortfolioConfigBuilder::default()
    }

    /// Load search credentials from environment
    ///
    /// Reads `SEARCH_API_KEY` and, if set, `SEARCH_API_BASE`.
    pub fn with_env_keys(mut self) -> Self {
        apply_env(
            |key| std::env::var(key).ok(),
            &mut self.search_api_key,
            &mut self.search_api_base,
        );
        self
    }

    /// Whether web search can be used
    pub fn search_enabled(&self) -> bool {
        self.search_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.quote_cache_ttl.is_zero() {
            return Err(PortfolioError::ConfigError(
                "quote_cache_ttl must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(PortfolioError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.search_max_results == 0 {
            return Err(PortfolioError::ConfigError(
                "search_max_results must be greater than 0".to_string(),
            ));
        }

        if self.max_tool_iterations == Some(0) {
            return Err(PortfolioError::ConfigError(
                "max_tool_iterations must be greater than 0".to_string(),
            ));
        }

        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(PortfolioError::ConfigError(
                "model must not be empty".to_string(),
            ));
        }

        if !self.search_api_base.starts_with("http://") && !self.search_api_base.starts_with("https://") {
            return Err(PortfolioError::ConfigError(format!(
                "search_api_base must be an http(s) URL, got '{}'",
                self.search_api_base
            )));
        }

        Ok(())
    }
}

fn apply_env<F>(lookup: F, api_key: &mut Option<String>, api_base: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("SEARCH_API_KEY").filter(|k| !k.is_empty()) {
        *api_key = Some(key);
    }
    if let Some(base) = lookup("SEARCH_API_BASE").filter(|b| !b.is_empty()) {
        *api_base = base;
    }
}

/// Builder for PortfolioConfig
#[derive(Debug, Default)]
pub struct PortfolioConfigBuilder {
    model: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    max_tool_iterations: Option<usize>,
    quote_cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    search_api_base: Option<String>,
    search_api_key: Option<String>,
    search_max_results: Option<usize>,
}

impl PortfolioConfigBuilder {
    /// Set the model used by the portfolio agents
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the tool loop cap
    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = Some(max);
        self
    }

    /// Set quote cache TTL
    pub fn quote_cache_ttl(mut self, duration: Duration) -> Self {
        self.quote_cache_ttl = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the web search endpoint
    pub fn search_api_base(mut self, base: impl Into<String>) -> Self {
        self.search_api_base = Some(base.into());
        self
    }

    /// Set the web search API key
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Set the default number of search results
    pub fn search_max_results(mut self, max: usize) -> Self {
        self.search_max_results = Some(max);
        self
    }

    /// Load search credentials from environment
    pub fn with_env_keys(mut self) -> Self {
        let mut base = self.search_api_base.take().unwrap_or_default();
        apply_env(|key| std::env::var(key).ok(), &mut self.search_api_key, &mut base);
        if !base.is_empty() {
            self.search_api_base = Some(base);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PortfolioConfig> {
        let defaults = PortfolioConfig::default();

        let config = PortfolioConfig {
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_tool_iterations: self.max_tool_iterations,
            quote_cache_ttl: self.quote_cache_ttl.unwrap_or(defaults.quote_cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            search_api_base: self.search_api_base.unwrap_or(defaults.search_api_base),
            search_api_key: self.search_api_key,
            search_max_results: self.search_max_results.unwrap_or(defaults.search_max_results),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PortfolioConfig::default();
        assert_eq!(config.quote_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.search_api_base, DEFAULT_SEARCH_API_BASE);
        assert_eq!(config.search_max_results, 5);
        assert!(!config.search_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PortfolioConfig::builder()
            .model("gpt-4o")
            .quote_cache_ttl(Duration::from_secs(120))
            .search_api_key("key")
            .search_max_results(3)
            .build()
            .unwrap();

        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.quote_cache_ttl, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.search_max_results, 3);
        assert!(config.search_enabled());
    }

    #[test]
    fn test_validation() {
        let result = PortfolioConfig::builder().search_max_results(0).build();
        assert!(matches!(result, Err(PortfolioError::ConfigError(_))));

        let result = PortfolioConfig::builder().max_tool_iterations(0).build();
        assert!(result.is_err());

        let result = PortfolioConfig::builder().search_api_base("api.tavily.com").build();
        assert!(result.is_err());

        let result = PortfolioConfig::builder().quote_cache_ttl(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_lookup() {
        let env: HashMap<&str, &str> = [
            ("SEARCH_API_KEY", "tvly-123"),
            ("SEARCH_API_BASE", "http://localhost:8080/search"),
        ]
        .into_iter()
        .collect();

        let mut key = None;
        let mut base = DEFAULT_SEARCH_API_BASE.to_string();
        apply_env(|k| env.get(k).map(ToString::to_string), &mut key, &mut base);

        assert_eq!(key.as_deref(), Some("tvly-123"));
        assert_eq!(base, "http://localhost:8080/search");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut key = Some("existing".to_string());
        let mut base = DEFAULT_SEARCH_API_BASE.to_string();
        apply_env(|_| Some(String::new()), &mut key, &mut base);

        assert_eq!(key.as_deref(), Some("existing"));
        assert_eq!(base, DEFAULT_SEARCH_API_BASE);
    }
}
