//! Shared utilities for the portfolio agents workspace
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and process-level configuration.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, ModelSettings};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
