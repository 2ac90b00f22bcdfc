//! Agent runtime for executing agents with dependency injection
//!
//! This crate provides the runtime infrastructure for executing agents,
//! including the AgentExecutor for the model/tool loop, AgentRuntime for
//! shared resources, and the ChatAgent leaf implementation.

pub mod agents;
pub mod config;
pub mod executor;
pub mod runtime;

// Re-export key types
pub use agents::{ChatAgent, ChatAgentBuilder};
pub use config::AgentConfig;
pub use executor::{
    AgentExecutor, ExecutionOutcome, ExecutorEvent, ExecutorStream, ResponseMode,
    TURN_TEXT_SEPARATOR,
};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, RuntimeConfig};
