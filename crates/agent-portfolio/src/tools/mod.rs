//! Tools offered to the portfolio agents

mod stock_price;
mod time;
mod web_search;

pub use stock_price::{StockPriceForDateTool, StockPriceTool, format_quote_table, normalize_symbol};
pub use time::{CurrentTimeTool, format_rfc1123};
pub use web_search::WebSearchTool;

use crate::api::{QuoteSource, SearchBackend, WebSearchClient, YahooFinanceClient};
use crate::cache::QuoteCache;
use crate::config::PortfolioConfig;
use agent_core::Result;
use agent_tools::{Tool, ToolRegistry};
use std::sync::Arc;

/// Name of the current time tool
pub const CURRENT_UTC_TIME: &str = "current_utc_time";
/// Name of the latest stock price tool
pub const STOCK_PRICE: &str = "stock_price";
/// Name of the dated stock price tool
pub const STOCK_PRICE_FOR_DATE: &str = "stock_price_for_date";
/// Name of the web search tool
pub const WEB_SEARCH: &str = "web_search";

/// The full set of portfolio tools, sharing one quote cache
#[derive(Clone)]
pub struct PortfolioTools {
    config: Arc<PortfolioConfig>,
    current_time: Arc<dyn Tool>,
    stock_price: Arc<dyn Tool>,
    stock_price_for_date: Arc<dyn Tool>,
    web_search: Arc<dyn Tool>,
}

impl std::fmt::Debug for PortfolioTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTools")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PortfolioTools {
    /// Tools backed by Yahoo Finance and the configured web search API
    pub fn new(config: PortfolioConfig) -> Result<Self> {
        config.validate()?;
        let search = WebSearchClient::new(&config)
            .map_err(|e| agent_core::Error::Configuration(e.to_string()))?;
        Ok(Self::with_backends(
            config,
            Arc::new(YahooFinanceClient::new()),
            Arc::new(search),
        ))
    }

    /// Tools over custom quote and search backends
    pub fn with_backends(
        config: PortfolioConfig,
        quotes: Arc<dyn QuoteSource>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        let cache = QuoteCache::new(config.quote_cache_ttl);
        let default_results = config.search_max_results;

        Self {
            config: Arc::new(config),
            current_time: Arc::new(CurrentTimeTool),
            stock_price: Arc::new(StockPriceTool::new(Arc::clone(&quotes), cache.clone())),
            stock_price_for_date: Arc::new(StockPriceForDateTool::new(quotes, cache)),
            web_search: Arc::new(WebSearchTool::new(search, default_results)),
        }
    }

    /// Configuration the tools were built with
    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn current_time(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.current_time)
    }

    pub fn stock_price(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.stock_price)
    }

    pub fn stock_price_for_date(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.stock_price_for_date)
    }

    pub fn web_search(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.web_search)
    }

    /// Every tool, in a stable order
    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            self.current_time(),
            self.stock_price(),
            self.stock_price_for_date(),
            self.web_search(),
        ]
    }

    /// A registry holding every tool, for use as a runtime catalogue
    pub fn registry(&self) -> Result<ToolRegistry> {
        ToolRegistry::from_tools(self.all())
    }
}
