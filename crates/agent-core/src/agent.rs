//! Core Agent trait definition

use crate::{ConversationThread, Result, RunContext, ThreadMessage};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Outcome of a completed agent turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Identifier of the agent that produced the result
    pub agent_id: String,
    /// Final answer text
    pub text: String,
    /// Every message exchanged during the turn, user input first
    pub messages: Vec<ThreadMessage>,
}

/// One attributed fragment of incrementally produced output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSegment {
    /// Identifier of the producing agent
    pub agent_id: String,
    /// Display name of the producing agent
    pub agent_name: String,
    /// Text fragment; empty on a bare completion marker
    pub text: String,
    /// Set on the last segment an agent emits for its turn
    pub is_final_for_agent: bool,
}

impl StreamSegment {
    /// A text fragment
    pub fn fragment(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            text: text.into(),
            is_final_for_agent: false,
        }
    }

    /// The completion marker that closes an agent's turn
    pub fn finished(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            text: String::new(),
            is_final_for_agent: true,
        }
    }
}

/// Lazy, finite, non-restartable sequence of stream segments
pub type SegmentStream<'a> = BoxStream<'a, Result<StreamSegment>>;

/// Core trait that all agents must implement
///
/// Leaf agents and composite workflows both implement this trait, so a
/// workflow can be used anywhere an agent can, including as a stage of
/// another workflow.
///
/// Implementations are immutable and shared across concurrent requests. The
/// optional thread is the only per-session state; it is borrowed mutably, so
/// one thread serves one in-flight turn at a time.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier assigned at construction
    fn id(&self) -> &str;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Short human readable description
    fn description(&self) -> &str {
        ""
    }

    /// Run one turn and return the complete result
    ///
    /// When `thread` is given, its history is sent as context ahead of
    /// `input`, and the user input plus the final answer are appended to it
    /// only if the turn succeeds.
    async fn run(
        &self,
        input: String,
        thread: Option<&mut ConversationThread>,
        ctx: &RunContext,
    ) -> Result<AgentResult>;

    /// Run one turn, yielding text fragments as they are produced
    ///
    /// Concatenating the fragment texts gives the same text `run` would have
    /// returned. The thread is committed only once the stream has been
    /// driven to completion; dropping it early leaves the thread untouched.
    fn run_streaming<'a>(
        &'a self,
        input: String,
        thread: Option<&'a mut ConversationThread>,
        ctx: &'a RunContext,
    ) -> SegmentStream<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_constructors() {
        let fragment = StreamSegment::fragment("id-1", "Researcher", "hello");
        assert!(!fragment.is_final_for_agent);
        assert_eq!(fragment.text, "hello");

        let done = StreamSegment::finished("id-1", "Researcher");
        assert!(done.is_final_for_agent);
        assert!(done.text.is_empty());
    }
}
