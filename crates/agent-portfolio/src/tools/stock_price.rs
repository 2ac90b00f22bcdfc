//! Tools for fetching stock prices

use agent_core::Result as AgentResult;
use agent_tools::{ParamType, ParameterSchema, Tool};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{STOCK_PRICE, STOCK_PRICE_FOR_DATE};
use crate::api::{Quote, QuoteSource};
use crate::cache::{CacheKey, QuoteCache};
use crate::error::{PortfolioError, Result};

const MAX_SYMBOL_LEN: usize = 12;

/// Render a quote as a one-row markdown table
pub fn format_quote_table(quote: &Quote) -> String {
    format!(
        "| Symbol | Price | Open | Low | High | Date |\n\
         | ----- | ----- | ----- | ----- | ----- | ----- |\n\
         | {} | {:.2} | {:.2} | {:.2} | {:.2} | {} |\n",
        quote.symbol,
        quote.close,
        quote.open,
        quote.low,
        quote.high,
        quote.date().format("%Y-%m-%d"),
    )
}

/// Normalize a ticker symbol to upper case, rejecting anything that cannot be one
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

    if valid {
        Ok(symbol)
    } else {
        Err(PortfolioError::InvalidSymbol(symbol))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| PortfolioError::InvalidDate {
        value: value.to_string(),
    })
}

fn symbol_schema() -> ParameterSchema {
    ParameterSchema::new().required(
        "symbol",
        ParamType::String,
        "Stock ticker symbol (e.g., 'MSFT', 'AAPL')",
    )
}

#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct DatedParams {
    symbol: String,
    date: String,
}

/// Latest price of a stock
#[derive(Clone)]
pub struct StockPriceTool {
    source: Arc<dyn QuoteSource>,
    cache: QuoteCache,
}

impl StockPriceTool {
    /// Create a new stock price tool
    pub fn new(source: Arc<dyn QuoteSource>, cache: QuoteCache) -> Self {
        Self { source, cache }
    }

    async fn fetch(&self, params: SymbolParams) -> Result<String> {
        let symbol = normalize_symbol(&params.symbol)?;
        let quote = self
            .cache
            .get_or_fetch(CacheKey::latest(&symbol), || self.source.latest_quote(&symbol))
            .await?;
        Ok(format_quote_table(&quote))
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: SymbolParams =
            serde_json::from_value(params).map_err(|e| agent_core::Error::SchemaMismatch {
                tool: STOCK_PRICE.to_string(),
                reason: e.to_string(),
            })?;

        self.fetch(params)
            .await
            .map(|table| json!(table))
            .map_err(|e| e.into_tool_error(STOCK_PRICE))
    }

    fn name(&self) -> &str {
        STOCK_PRICE
    }

    fn description(&self) -> &str {
        "Gets the latest stock price, open, low and high for a stock symbol."
    }

    fn parameters(&self) -> ParameterSchema {
        symbol_schema()
    }
}

/// Price of a stock on a given trading day
#[derive(Clone)]
pub struct StockPriceForDateTool {
    source: Arc<dyn QuoteSource>,
    cache: QuoteCache,
}

impl StockPriceForDateTool {
    /// Create a new dated stock price tool
    pub fn new(source: Arc<dyn QuoteSource>, cache: QuoteCache) -> Self {
        Self { source, cache }
    }

    async fn fetch(&self, params: DatedParams) -> Result<String> {
        let symbol = normalize_symbol(&params.symbol)?;
        let date = parse_date(&params.date)?;
        let key = CacheKey::on_date(&symbol, date.to_string());
        let quote = self
            .cache
            .get_or_fetch(key, || self.source.quote_on(&symbol, date))
            .await?;
        Ok(format_quote_table(&quote))
    }
}

#[async_trait]
impl Tool for StockPriceForDateTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: DatedParams =
            serde_json::from_value(params).map_err(|e| agent_core::Error::SchemaMismatch {
                tool: STOCK_PRICE_FOR_DATE.to_string(),
                reason: e.to_string(),
            })?;

        self.fetch(params)
            .await
            .map(|table| json!(table))
            .map_err(|e| e.into_tool_error(STOCK_PRICE_FOR_DATE))
    }

    fn name(&self) -> &str {
        STOCK_PRICE_FOR_DATE
    }

    fn description(&self) -> &str {
        "Gets the stock price, open, low and high for a stock symbol on a specific date. \
         Non-trading days resolve to the next trading day."
    }

    fn parameters(&self) -> ParameterSchema {
        symbol_schema().required("date", ParamType::String, "Date in YYYY-MM-DD format")
    }
}
