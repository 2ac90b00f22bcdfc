//! Tool for searching the web for news and market sentiment

use agent_core::Result as AgentResult;
use agent_tools::{ParamType, ParameterSchema, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::WEB_SEARCH;
use crate::api::SearchBackend;

/// Upper bound on results a single call may ask for
const MAX_RESULTS_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

/// Web search over a [`SearchBackend`]
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
    default_max_results: usize,
}

impl WebSearchTool {
    /// Create a new web search tool
    pub fn new(backend: Arc<dyn SearchBackend>, default_max_results: usize) -> Self {
        Self {
            backend,
            default_max_results,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: SearchParams =
            serde_json::from_value(params).map_err(|e| agent_core::Error::SchemaMismatch {
                tool: WEB_SEARCH.to_string(),
                reason: e.to_string(),
            })?;

        let max_results = params
            .max_results
            .unwrap_or(self.default_max_results)
            .clamp(1, MAX_RESULTS_LIMIT);
        debug!(query = %params.query, max_results, "Searching the web");

        let hits = self
            .backend
            .search(&params.query, max_results)
            .await
            .map_err(|e| e.into_tool_error(WEB_SEARCH))?;

        serde_json::to_value(hits).map_err(|e| agent_core::Error::ToolInvocation {
            tool: WEB_SEARCH.to_string(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Searches the web for recent news, analyst opinions and market sentiment. \
         Returns a list of results with title, url and snippet."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("query", ParamType::String, "Search query")
            .optional(
                "max_results",
                ParamType::Integer,
                "Maximum number of results to return (1-10)",
            )
    }
}
