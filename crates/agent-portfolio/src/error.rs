//! Error types for market data and search operations

use thiserror::Error;

/// Portfolio tooling errors
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Date argument is not a calendar date
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        value: String,
    },

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for portfolio operations
pub type Result<T> = std::result::Result<T, PortfolioError>;

impl PortfolioError {
    /// Report this error as the failure of a tool call
    ///
    /// The executor feeds tool failures back to the model, so the message is
    /// written for the model to read.
    pub fn into_tool_error(self, tool: &str) -> agent_core::Error {
        agent_core::Error::ToolInvocation {
            tool: tool.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Convert PortfolioError to agent_core::Error
impl From<PortfolioError> for agent_core::Error {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::ConfigError(msg) => agent_core::Error::Configuration(msg),
            other => other.into_tool_error("agent-portfolio"),
        }
    }
}
