//! Yahoo Finance API client

use super::QuoteSource;
use crate::error::{PortfolioError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

/// Trading days are looked up in a window this long, to step over weekends
/// and market holidays
const HISTORY_WINDOW_DAYS: i64 = 7;

/// Yahoo Finance API client
#[derive(Debug, Default, Clone)]
pub struct YahooFinanceClient {}

/// Stock quote data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjclose: f64,
}

impl Quote {
    fn from_yahoo(symbol: &str, quote: &yahoo::Quote) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp: DateTime::from_timestamp(quote.timestamp as i64, 0).unwrap_or_else(Utc::now),
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume,
            adjclose: quote.adjclose,
        }
    }

    /// Trading day of the quote
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {}
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| PortfolioError::YahooFinanceError(e.to_string()))
    }
}

fn to_offset(at: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| PortfolioError::YahooFinanceError(format!("Invalid timestamp: {e}")))
}

#[async_trait]
impl QuoteSource for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let response = Self::connector()?
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| PortfolioError::YahooFinanceError(e.to_string()))?;

        let quote = response
            .last_quote()
            .map_err(|e| PortfolioError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Quote::from_yahoo(symbol, &quote))
    }

    #[instrument(skip(self))]
    async fn quote_on(&self, symbol: &str, date: NaiveDate) -> Result<Quote> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| PortfolioError::InvalidDate {
                value: date.to_string(),
            })?
            .and_utc();
        let end = start + Duration::days(HISTORY_WINDOW_DAYS);

        let response = Self::connector()?
            .get_quote_history(symbol, to_offset(start)?, to_offset(end)?)
            .await
            .map_err(|e| PortfolioError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| PortfolioError::YahooFinanceError(e.to_string()))?;
        debug!(symbol, %date, count = quotes.len(), "Fetched quote history");

        quotes
            .first()
            .map(|q| Quote::from_yahoo(symbol, q))
            .ok_or_else(|| PortfolioError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no trading day between {date} and {}", end.date_naive()),
            })
    }
}
