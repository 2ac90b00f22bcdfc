//! LLM provider abstraction layer
//!
//! This crate provides provider-agnostic abstractions for interacting with
//! chat-completion models. It includes:
//!
//! - Message types for LLM communication, and conversion to and from
//!   conversation threads
//! - Completion request/response types, buffered and streamed
//! - Tool definitions for function calling
//! - Provider trait for LLM implementations
//! - An OpenAI / Azure OpenAI provider (behind the `openai` feature)
//! - A scripted provider for tests (behind the `testing` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

// Re-export main types
pub use completion::{
    CompletionRequest, CompletionResponse, CompletionStream, StopReason, StreamAccumulator,
    StreamEvent, TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role, ToolUse};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
