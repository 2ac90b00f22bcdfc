//! Wiring of the model endpoint and tools into an agent runtime

use crate::tools::PortfolioTools;
use agent_core::{Error, Result};
use agent_llm::LLMProvider;
use agent_llm::providers::OpenAIProvider;
use agent_runtime::{AgentRuntime, RuntimeConfig};
use agent_utils::AppConfig;
use std::sync::Arc;
use tracing::info;

/// Runtime over an explicit provider, with the portfolio tools as catalogue
pub fn portfolio_runtime(
    app: &AppConfig,
    provider: Arc<dyn LLMProvider>,
    tools: &PortfolioTools,
) -> Result<AgentRuntime> {
    AgentRuntime::builder()
        .provider(provider)
        .tool_registry(Arc::new(tools.registry()?))
        .config(RuntimeConfig::from_app_config(app))
        .build()
}

/// Runtime talking to the OpenAI-compatible endpoint named in `app`
pub fn openai_runtime(app: &AppConfig, tools: &PortfolioTools) -> Result<AgentRuntime> {
    let provider = OpenAIProvider::from_settings(&app.model)
        .map_err(|e| Error::Configuration(e.to_string()))?;
    info!(
        api_base = %app.model.api_base,
        model = %app.model.model,
        azure = app.model.api_version.is_some(),
        "Using OpenAI-compatible model endpoint"
    );
    portfolio_runtime(app, Arc::new(provider), tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockQuoteSource, MockSearchBackend};
    use crate::config::PortfolioConfig;
    use agent_llm::testing::ScriptedProvider;

    #[test]
    fn test_runtime_uses_app_defaults() {
        let app = AppConfig::from_lookup(|key| match key {
            "OPENAI_MODEL" => Some("gpt-4.1".to_string()),
            "MAX_TOOL_ITERATIONS" => Some("6".to_string()),
            _ => None,
        })
        .unwrap();
        let tools = PortfolioTools::with_backends(
            PortfolioConfig::default(),
            Arc::new(MockQuoteSource::new()),
            Arc::new(MockSearchBackend::new()),
        );

        let runtime = portfolio_runtime(&app, Arc::new(ScriptedProvider::new()), &tools).unwrap();

        assert_eq!(runtime.config().default_model, "gpt-4.1");
        assert_eq!(runtime.config().default_max_iterations, 6);
        assert_eq!(runtime.tools().len(), 4);
        assert_eq!(runtime.select_tools(&["web_search"]).unwrap().len(), 1);
    }
}
