//! Concrete agent implementations
//!
//! - ChatAgent: instructions + tools + a model, driven by the AgentExecutor
//!   tool loop

pub mod chat;

pub use chat::{ChatAgent, ChatAgentBuilder};
