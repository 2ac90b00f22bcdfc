//! Request/response chat surface over a single agent
//!
//! The caller owns the conversation: every request carries the full message
//! history and every response returns it extended by the new turn.

use agent_core::{Agent, ConversationThread, RunContext, ThreadMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message of the caller-held history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    fn to_thread_message(&self) -> ThreadMessage {
        match self.role {
            ChatRole::User => ThreadMessage::user(&self.content),
            ChatRole::Assistant => ThreadMessage::assistant(&self.content),
        }
    }
}

/// Inbound chat request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub input_message: String,
    #[serde(default)]
    pub message_history: Vec<ChatMessage>,
}

/// Outbound chat response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub full_message: String,
    pub message_history: Vec<ChatMessage>,
}

/// Answers chat requests with one agent
#[derive(Clone)]
pub struct ChatService {
    agent: Arc<dyn Agent>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("agent", &self.agent.name())
            .finish()
    }
}

impl ChatService {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }

    /// Run one turn against the request's history
    ///
    /// Never fails: an agent error becomes the assistant reply
    /// `Error processing request: <cause>`. An empty input returns the
    /// history unchanged with an empty message.
    pub async fn reply(&self, request: ChatRequest, ctx: &RunContext) -> ChatResponse {
        let ChatRequest {
            input_message,
            message_history,
        } = request;

        if input_message.is_empty() {
            return ChatResponse {
                full_message: String::new(),
                message_history,
            };
        }

        let mut thread = ConversationThread::from_history(
            message_history.iter().map(ChatMessage::to_thread_message).collect(),
        );

        let full_message = match self
            .agent
            .run(input_message.clone(), Some(&mut thread), ctx)
            .await
        {
            Ok(result) => {
                info!(agent = %self.agent.name(), chars = result.text.len(), "Chat turn completed");
                result.text
            }
            Err(err) => {
                warn!(agent = %self.agent.name(), error = %err, "Chat turn failed");
                format!("Error processing request: {err}")
            }
        };

        let mut history = message_history;
        history.push(ChatMessage::user(input_message));
        history.push(ChatMessage::assistant(&full_message));

        ChatResponse {
            full_message,
            message_history: history,
        }
    }
}
