//! Agent configuration

use agent_core::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: usize = 4096;
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// Immutable configuration record of one agent
///
/// Validated once when the agent is built, never at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name
    pub name: String,

    /// Short description of what the agent does
    #[serde(default)]
    pub description: String,

    /// Fixed system prompt
    pub instructions: String,

    /// Model or deployment name
    pub model: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Cap on model round-trips in one turn
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            instructions: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

impl AgentConfig {
    /// Create a config with the given name and instructions
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration("agent name must not be empty".to_string()));
        }
        if self.instructions.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "agent '{}' has no instructions",
                self.name
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "agent '{}' has no model",
                self.name
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::Configuration(format!(
                "agent '{}': max_tokens must be greater than 0",
                self.name
            )));
        }
        if self.max_tool_iterations == 0 {
            return Err(Error::Configuration(format!(
                "agent '{}': max_tool_iterations must be greater than 0",
                self.name
            )));
        }
        if let Some(temp) = self.temperature
            && !(0.0..=2.0).contains(&temp)
        {
            return Err(Error::Configuration(format!(
                "agent '{}': temperature must be between 0.0 and 2.0",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new("Echo", "Echo the input uppercased");
        assert_eq!(config.max_tool_iterations, 10);
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        assert!(AgentConfig::new("", "x").validate().is_err());
        assert!(AgentConfig::new("a", "  ").validate().is_err());

        let mut config = AgentConfig::new("a", "b");
        config.max_tool_iterations = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = AgentConfig::new("a", "b");
        config.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }
}
