//! Web search API client
//!
//! Speaks the JSON search protocol of Tavily and compatible services: a POST
//! of `{api_key, query, max_results}` answered with
//! `{results: [{title, url, content}]}`.

use super::SearchBackend;
use crate::config::PortfolioConfig;
use crate::error::{PortfolioError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One search result as handed to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title,
            url: result.url,
            snippet: result.content,
        }
    }
}

/// HTTP client for the web search API
#[derive(Debug, Clone)]
pub struct WebSearchClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl WebSearchClient {
    /// Create a client from the portfolio configuration
    pub fn new(config: &PortfolioConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_base: config.search_api_base.clone(),
            api_key: config.search_api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl SearchBackend for WebSearchClient {
    #[instrument(skip(self), fields(api_base = %self.api_base))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PortfolioError::ConfigError("web search is not configured (set SEARCH_API_KEY)".to_string())
        })?;

        let response = self
            .client
            .post(&self.api_base)
            .json(&SearchRequest {
                api_key,
                query,
                max_results,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortfolioError::ApiError(format!(
                "search request failed with status {status}: {body}"
            )));
        }

        let body: SearchResponse = serde_json::from_str(&response.text().await?)?;
        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect();
        debug!(count = hits.len(), "Web search completed");

        Ok(hits)
    }
}
