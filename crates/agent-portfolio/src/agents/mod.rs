//! Financial analysis agent and the portfolio workflow

pub mod prompts;

use crate::config::PortfolioConfig;
use crate::tools::PortfolioTools;
use agent_core::Result;
use agent_runtime::{AgentRuntime, ChatAgent, ChatAgentBuilder};
use agent_workflow::{SequentialWorkflow, WorkflowAgent};
use std::sync::Arc;
use tracing::info;

pub const FINANCIAL_ANALYSIS_AGENT: &str = "FinancialAnalysisAgent";
pub const PORTFOLIO_RESEARCH_AGENT: &str = "PortfolioResearchAgent";
pub const RISK_ASSESSMENT_AGENT: &str = "RiskAssessmentAgent";
pub const INVESTMENT_ADVISOR_AGENT: &str = "InvestmentAdvisorAgent";
pub const PORTFOLIO_WORKFLOW: &str = "PortfolioAnalysisWorkflow";

/// Wrap console input into the request the portfolio workflow expects
pub fn portfolio_request(holdings: &str) -> String {
    format!("Analyze this portfolio of stocks: {}", holdings.trim())
}

fn configured(mut builder: ChatAgentBuilder, config: &PortfolioConfig) -> ChatAgentBuilder {
    if let Some(model) = &config.model {
        builder = builder.model(model.clone());
    }
    if let Some(max_tokens) = config.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }
    if let Some(temperature) = config.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(max) = config.max_tool_iterations {
        builder = builder.max_tool_iterations(max);
    }
    builder
}

/// Single agent answering free-form financial questions
///
/// Has every portfolio tool. Pair it with a
/// [`ConversationThread`](agent_core::ConversationThread) for multi-turn chat.
pub fn financial_analysis_agent(runtime: &AgentRuntime, tools: &PortfolioTools) -> Result<ChatAgent> {
    let builder = runtime
        .chat_agent(FINANCIAL_ANALYSIS_AGENT)
        .description("Analyzes stocks and market topics using prices and web search")
        .instructions(prompts::FINANCIAL_ANALYSIS_INSTRUCTIONS)
        .tools(tools.all());

    configured(builder, tools.config()).build()
}

/// Research, then risk assessment, then investment advice
///
/// Only the research stage has tools; the later stages work from the
/// output handed to them.
pub fn portfolio_workflow(runtime: &AgentRuntime, tools: &PortfolioTools) -> Result<WorkflowAgent> {
    let config = tools.config();

    let research = configured(
        runtime
            .chat_agent(PORTFOLIO_RESEARCH_AGENT)
            .description("Gathers market data and news for portfolio stocks")
            .instructions(prompts::RESEARCH_INSTRUCTIONS)
            .tools([tools.stock_price(), tools.web_search(), tools.current_time()]),
        config,
    )
    .build()?;

    let risk = configured(
        runtime
            .chat_agent(RISK_ASSESSMENT_AGENT)
            .description("Analyzes portfolio risk and diversification")
            .instructions(prompts::RISK_ASSESSMENT_INSTRUCTIONS),
        config,
    )
    .build()?;

    let advisor = configured(
        runtime
            .chat_agent(INVESTMENT_ADVISOR_AGENT)
            .description("Provides investment recommendations based on research and risk analysis")
            .instructions(prompts::INVESTMENT_ADVISOR_INSTRUCTIONS),
        config,
    )
    .build()?;

    let workflow = SequentialWorkflow::builder(PORTFOLIO_WORKFLOW)
        .description("Sequential portfolio analysis: research, risk, advice")
        .add_agent(Arc::new(research))
        .add_agent(Arc::new(risk))
        .add_agent(Arc::new(advisor))
        .build()?;

    info!(workflow = PORTFOLIO_WORKFLOW, stages = workflow.stage_count(), "Built portfolio workflow");
    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockQuoteSource, MockSearchBackend};
    use agent_core::{Agent, RunContext};
    use agent_llm::testing::{ScriptedProvider, last_user_text, text_response};
    use futures::StreamExt;

    fn tools(config: PortfolioConfig) -> PortfolioTools {
        PortfolioTools::with_backends(
            config,
            Arc::new(MockQuoteSource::new()),
            Arc::new(MockSearchBackend::new()),
        )
    }

    fn runtime(provider: Arc<ScriptedProvider>) -> AgentRuntime {
        AgentRuntime::builder().provider(provider).build().unwrap()
    }

    /// Each agent answers with a tag derived from its instructions
    fn tagging_provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new().with_responder(|req| {
            let system = req.system.clone().unwrap_or_default();
            let tag = if system.contains("Portfolio Research Agent") {
                "RESEARCH"
            } else if system.contains("Risk Assessment Agent") {
                "RISK"
            } else {
                "ADVICE"
            };
            Ok(text_response(format!("{tag}<{}>", last_user_text(req).len())))
        }))
    }

    #[test]
    fn test_portfolio_request() {
        assert_eq!(
            portfolio_request(" MSFT, AAPL \n"),
            "Analyze this portfolio of stocks: MSFT, AAPL"
        );
    }

    #[test]
    fn test_financial_agent_has_every_tool() {
        let config = PortfolioConfig::builder().model("gpt-4o").max_tool_iterations(3).build().unwrap();
        let agent = financial_analysis_agent(&runtime(tagging_provider()), &tools(config)).unwrap();

        assert_eq!(agent.name(), FINANCIAL_ANALYSIS_AGENT);
        assert_eq!(agent.tools().len(), 4);
        assert_eq!(agent.config().model, "gpt-4o");
        assert_eq!(agent.config().max_tool_iterations, 3);
    }

    #[test]
    fn test_workflow_stages() {
        let workflow =
            portfolio_workflow(&runtime(tagging_provider()), &tools(PortfolioConfig::default())).unwrap();

        let names: Vec<&str> = workflow.steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [PORTFOLIO_RESEARCH_AGENT, RISK_ASSESSMENT_AGENT, INVESTMENT_ADVISOR_AGENT]
        );
    }

    #[tokio::test]
    async fn test_workflow_streams_each_stage_in_order() {
        let provider = tagging_provider();
        let workflow =
            portfolio_workflow(&runtime(provider.clone()), &tools(PortfolioConfig::default())).unwrap();
        let ctx = RunContext::new();

        let relayed: Vec<_> = workflow
            .relay(portfolio_request("MSFT, AAPL"), &ctx)
            .map(|s| s.unwrap())
            .collect()
            .await;

        let headers: Vec<&str> = relayed
            .iter()
            .filter(|r| r.new_attribution)
            .map(|r| r.segment.agent_name.as_str())
            .collect();
        assert_eq!(
            headers,
            [PORTFOLIO_RESEARCH_AGENT, RISK_ASSESSMENT_AGENT, INVESTMENT_ADVISOR_AGENT]
        );
        assert_eq!(provider.call_count(), 3);

        let research_request = &provider.requests()[0];
        assert_eq!(
            last_user_text(research_request),
            "Analyze this portfolio of stocks: MSFT, AAPL"
        );
        assert_eq!(research_request.tools.as_ref().map(Vec::len), Some(3));
        assert!(provider.requests()[1].tools.is_none());
    }
}
