//! Core abstractions for the portfolio agents workspace
//!
//! This crate defines the fundamental traits and types used throughout the
//! framework: the `Agent` contract, conversation threads, streaming segments,
//! the per-run context and the error taxonomy.

pub mod agent;
pub mod context;
pub mod error;
pub mod thread;

pub use agent::{Agent, AgentResult, SegmentStream, StreamSegment};
pub use context::RunContext;
pub use error::{Error, Result};
pub use thread::{ConversationThread, MessageRole, ThreadMessage, ToolCallRef};
