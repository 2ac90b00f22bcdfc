//! Clients for market data and web search

pub mod search;
pub mod yahoo;

pub use search::{SearchHit, WebSearchClient};
pub use yahoo::{Quote, YahooFinanceClient};

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of stock quotes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Most recent quote of a symbol
    async fn latest_quote(&self, symbol: &str) -> Result<Quote>;

    /// Quote of the first trading day on or after `date`
    async fn quote_on(&self, symbol: &str, date: NaiveDate) -> Result<Quote>;
}

/// Web search backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search the web, returning at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}
