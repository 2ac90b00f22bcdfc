//! Portfolio analysis agents
//!
//! This crate puts the agent framework to work on stock portfolios:
//!
//! - Market data and web search tools (current UTC time, latest stock price,
//!   stock price for a date, web search) with a shared quote cache
//! - A financial analysis agent for multi-turn chat
//! - A three-stage sequential workflow: research, risk assessment, advice
//! - A request/response chat service where the caller holds the history
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_portfolio::{PortfolioConfig, PortfolioTools, openai_runtime, portfolio_request, portfolio_workflow};
//! use agent_core::{Agent, RunContext};
//! use agent_utils::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = AppConfig::from_env()?;
//!     let tools = PortfolioTools::new(PortfolioConfig::default().with_env_keys())?;
//!     let runtime = openai_runtime(&app, &tools)?;
//!
//!     let workflow = portfolio_workflow(&runtime, &tools)?;
//!     let result = workflow
//!         .run(portfolio_request("MSFT, AAPL, NVDA"), None, &RunContext::new())
//!         .await?;
//!     println!("{}", result.text);
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod api;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod setup;
pub mod tools;

pub use agents::{financial_analysis_agent, portfolio_request, portfolio_workflow};
pub use cache::QuoteCache;
pub use chat::{ChatMessage, ChatRequest, ChatResponse, ChatRole, ChatService};
pub use config::{PortfolioConfig, PortfolioConfigBuilder};
pub use error::{PortfolioError, Result};
pub use setup::{openai_runtime, portfolio_runtime};
pub use tools::PortfolioTools;
