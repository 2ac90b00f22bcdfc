//! Conversation threads
//!
//! A thread is the append-only message log that gives one agent memory
//! across separate invocations. Threads are owned by a single agent and are
//! never truncated here; callers that want a shorter memory start a new one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Role of a message inside a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Input from the caller
    User,
    /// Text produced by an agent
    Assistant,
    /// A tool call requested by the model
    ToolCall,
    /// The outcome of a tool call
    ToolResult,
}

/// Identifies the tool call a `ToolCall`/`ToolResult` message belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRef {
    /// Call identifier assigned by the model
    pub id: String,
    /// Tool name
    pub name: String,
    /// Set on results that carry an error text
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// A single entry in a conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message role
    pub role: MessageRole,
    /// Text content; JSON arguments for tool calls
    pub content: String,
    /// Producing agent, set inside workflow runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_agent_id: Option<String>,
    /// Tool call this message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRef>,
}

impl ThreadMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            author_agent_id: None,
            tool_call: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool call message
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: String) -> Self {
        Self {
            tool_call: Some(ToolCallRef {
                id: id.into(),
                name: name.into(),
                is_error: false,
            }),
            ..Self::new(MessageRole::ToolCall, arguments)
        }
    }

    /// Create a tool result message
    pub fn tool_result(
        id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            tool_call: Some(ToolCallRef {
                id: id.into(),
                name: name.into(),
                is_error,
            }),
            ..Self::new(MessageRole::ToolResult, content)
        }
    }

    /// Attribute the message to an agent
    pub fn with_author(mut self, agent_id: impl Into<String>) -> Self {
        self.author_agent_id = Some(agent_id.into());
        self
    }
}

/// Ordered, append-only message log owned by one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationThread {
    id: String,
    owner: Option<String>,
    messages: Vec<ThreadMessage>,
}

impl Default for ConversationThread {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationThread {
    /// Create an empty, unowned thread
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: None,
            messages: Vec::new(),
        }
    }

    /// Create a thread seeded with prior history (e.g. from an inbound request)
    pub fn from_history(messages: Vec<ThreadMessage>) -> Self {
        Self {
            messages,
            ..Self::new()
        }
    }

    /// Thread identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Agent that owns this thread, once one has used it
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Bind the thread to `agent_id`, or verify it is already bound to it
    ///
    /// A thread never moves between agents.
    pub fn claim(&mut self, agent_id: &str) -> Result<()> {
        match &self.owner {
            Some(owner) if owner != agent_id => Err(Error::ThreadOwnership {
                thread_id: self.id.clone(),
                owner: owner.clone(),
                agent: agent_id.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.owner = Some(agent_id.to_string());
                Ok(())
            }
        }
    }

    /// Append a single message
    pub fn append(&mut self, message: ThreadMessage) {
        self.messages.push(message);
    }

    /// Append a completed turn in one step
    pub fn commit(&mut self, turn: impl IntoIterator<Item = ThreadMessage>) {
        self.messages.extend(turn);
    }

    /// Read-only view of the history, oldest first
    pub fn history(&self) -> &[ThreadMessage] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&ThreadMessage> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the thread has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
