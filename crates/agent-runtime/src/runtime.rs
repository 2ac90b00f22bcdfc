//! Runtime for building agents with dependency injection
//!
//! The AgentRuntime owns the resources every agent of an application shares
//! (the LLM provider and the catalogue of available tools) and hands out
//! pre-configured agent builders.

use agent_core::{Error, Result};
use agent_llm::LLMProvider;
use agent_tools::{Tool, ToolRegistry};
use agent_utils::config::AppConfig;
use std::sync::Arc;
use tracing::debug;

use crate::agents::ChatAgentBuilder;

/// Configuration for the agent runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Default maximum model round-trips for tool-using agents
    pub default_max_iterations: usize,

    /// Default model to use
    pub default_model: String,

    /// Default max tokens per completion
    pub default_max_tokens: usize,

    /// Default temperature, if any
    pub default_temperature: Option<f32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: 10,
            default_model: "gpt-4o-mini".to_string(),
            default_max_tokens: 4096,
            default_temperature: None,
        }
    }
}

impl RuntimeConfig {
    /// Derive runtime defaults from the application configuration
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            default_max_iterations: config.max_tool_iterations,
            default_model: config.model.model.clone(),
            ..Self::default()
        }
    }
}

/// Shared resources and agent factory
///
/// # Example
///
/// ```no_run
/// use agent_runtime::AgentRuntime;
/// # use std::sync::Arc;
///
/// # fn example(provider: Arc<dyn agent_llm::LLMProvider>) -> agent_core::Result<()> {
/// let runtime = AgentRuntime::builder()
///     .provider(provider)
///     .default_max_iterations(5)
///     .build()?;
///
/// let agent = runtime
///     .chat_agent("Assistant")
///     .instructions("You are a helpful assistant.")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: RuntimeConfig,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("provider", &self.provider.name())
            .field("tools", &self.tool_registry.names())
            .field("config", &self.config)
            .finish()
    }
}

impl AgentRuntime {
    /// Create a new agent runtime
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// Get a reference to the LLM provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get a reference to the shared tool catalogue
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Get a reference to the runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Look up tools from the shared catalogue by name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] if a name is not in the catalogue
    pub fn select_tools(&self, names: &[&str]) -> Result<Vec<Arc<dyn Tool>>> {
        Ok(self.tool_registry.select(names)?.list_tools())
    }

    /// Start building a chat agent with the runtime's provider and defaults
    pub fn chat_agent(&self, name: impl Into<String>) -> ChatAgentBuilder {
        let name = name.into();
        debug!(agent = %name, model = %self.config.default_model, "Creating chat agent builder");

        let mut builder = ChatAgentBuilder::new(name)
            .provider(Arc::clone(&self.provider))
            .model(self.config.default_model.clone())
            .max_tokens(self.config.default_max_tokens)
            .max_tool_iterations(self.config.default_max_iterations);
        if let Some(temperature) = self.config.default_temperature {
            builder = builder.temperature(temperature);
        }
        builder
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Option<Arc<ToolRegistry>>,
    config: RuntimeConfig,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the shared tool catalogue
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default max iterations
    pub fn default_max_iterations(mut self, max: usize) -> Self {
        self.config.default_max_iterations = max;
        self
    }

    /// Set the default model
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    /// Build the runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not set or a default is invalid
    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self
            .provider
            .ok_or_else(|| Error::Configuration("Provider not set".to_string()))?;

        if self.config.default_max_iterations == 0 {
            return Err(Error::Configuration(
                "default_max_iterations must be greater than 0".to_string(),
            ));
        }

        let tool_registry = self
            .tool_registry
            .unwrap_or_else(|| Arc::new(ToolRegistry::new()));

        Ok(AgentRuntime::new(provider, tool_registry, self.config))
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_llm::testing::ScriptedProvider;
    use agent_tools::ParameterSchema;
    use serde_json::json;

    #[test]
    fn test_runtime_config_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_max_iterations, 10);
        assert_eq!(config.default_model, "gpt-4o-mini");
    }

    #[test]
    fn test_runtime_config_from_app_config() {
        let app = AppConfig::from_lookup(|key| match key {
            "OPENAI_MODEL" => Some("gpt-4.1".to_string()),
            "MAX_TOOL_ITERATIONS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();

        let config = RuntimeConfig::from_app_config(&app);
        assert_eq!(config.default_model, app.model.model);
        assert_eq!(config.default_max_iterations, 3);
    }

    #[test]
    fn test_runtime_builder() {
        let builder = AgentRuntimeBuilder::new()
            .default_max_iterations(5)
            .default_model("test-model");

        assert_eq!(builder.config.default_max_iterations, 5);
        assert_eq!(builder.config.default_model, "test-model");
    }

    #[test]
    fn test_build_requires_provider() {
        assert!(matches!(
            AgentRuntime::builder().build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_chat_agent_inherits_defaults() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("getTime", "Current time", ParameterSchema::new(), |_| async {
                Ok(json!("09:30"))
            })
            .unwrap();

        let runtime = AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::new()))
            .tool_registry(Arc::new(registry))
            .default_max_iterations(4)
            .default_model("test-model")
            .build()
            .unwrap();

        let agent = runtime
            .chat_agent("Clock")
            .instructions("Tell the time")
            .tools(runtime.select_tools(&["getTime"]).unwrap())
            .build()
            .unwrap();

        assert_eq!(agent.config().model, "test-model");
        assert_eq!(agent.config().max_tool_iterations, 4);
        assert_eq!(agent.tools().names(), ["getTime"]);
        assert!(runtime.select_tools(&["missing"]).is_err());
    }
}
