//! Message types for LLM communication
//!
//! These are the wire-level messages sent to a provider. Conversation threads
//! store the provider-neutral `agent_core::ThreadMessage`; the conversions at
//! the bottom of this module translate between the two.

use agent_core::{MessageRole, ThreadMessage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// System message (handled separately in some providers)
    System,
}

/// Content block in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text {
        /// Text content
        text: String,
    },

    /// Tool use request from assistant
    ToolUse {
        /// Unique ID for this tool use
        id: String,
        /// Tool name
        name: String,
        /// Tool input parameters (JSON)
        input: serde_json::Value,
    },

    /// Tool result from user
    ToolResult {
        /// ID of the tool use this is responding to
        tool_use_id: String,
        /// Result content
        content: String,
        /// Whether this is an error result
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

/// A tool call extracted from an assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse<'a> {
    /// Call identifier
    pub id: &'a str,
    /// Tool name
    pub name: &'a str,
    /// Arguments
    pub input: &'a serde_json::Value,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create an assistant message from blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        }
    }

    /// Create a user message with tool result
    pub fn tool_result(tool_use_id: String, result: String) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id,
                content: result,
                is_error: None,
            }])),
        }
    }

    /// Create a user message with error tool result
    pub fn tool_error(tool_use_id: String, error: String) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id,
                content: error,
                is_error: Some(true),
            }])),
        }
    }

    /// All text content of the message, concatenated
    pub fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Extract tool use requests, in the order the model issued them
    pub fn tool_uses(&self) -> Vec<ToolUse<'_>> {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Check if this message contains any tool uses
    pub fn has_tool_uses(&self) -> bool {
        !self.tool_uses().is_empty()
    }
}

/// Convert a thread history into provider messages
///
/// Consecutive tool-call entries are folded into the preceding assistant
/// message so that every tool result follows the assistant turn that
/// requested it.
pub fn from_thread(history: &[ThreadMessage]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(history.len());

    for entry in history {
        match entry.role {
            MessageRole::User => messages.push(Message::user(entry.content.clone())),
            MessageRole::Assistant => messages.push(Message::assistant(entry.content.clone())),
            MessageRole::ToolCall => {
                let Some(call) = &entry.tool_call else {
                    continue;
                };
                let input = serde_json::from_str(&entry.content)
                    .unwrap_or_else(|_| serde_json::Value::String(entry.content.clone()));
                let block = ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input,
                };
                push_tool_use(&mut messages, block);
            }
            MessageRole::ToolResult => {
                let Some(call) = &entry.tool_call else {
                    continue;
                };
                messages.push(if call.is_error {
                    Message::tool_error(call.id.clone(), entry.content.clone())
                } else {
                    Message::tool_result(call.id.clone(), entry.content.clone())
                });
            }
        }
    }

    messages
}

fn push_tool_use(messages: &mut Vec<Message>, block: ContentBlock) {
    if let Some(last) = messages.last_mut()
        && last.role == Role::Assistant
    {
        let blocks = match last.content.take() {
            Some(MessageContent::Blocks(blocks)) => blocks,
            Some(MessageContent::Text(text)) if text.is_empty() => Vec::new(),
            Some(MessageContent::Text(text)) => vec![ContentBlock::Text { text }],
            None => Vec::new(),
        };
        let mut blocks = blocks;
        blocks.push(block);
        last.content = Some(MessageContent::Blocks(blocks));
        return;
    }
    messages.push(Message::assistant_blocks(vec![block]));
}

/// Convert a provider message into thread entries
///
/// An assistant message with text and tool calls becomes one `Assistant`
/// entry (when the text is non-empty) followed by one `ToolCall` entry per
/// call. Tool result blocks become `ToolResult` entries; `tool_names` maps
/// call ids back to the tool that was called.
pub fn to_thread(message: &Message, tool_names: &dyn Fn(&str) -> String) -> Vec<ThreadMessage> {
    let mut entries = Vec::new();
    match (&message.role, &message.content) {
        (Role::User, Some(MessageContent::Text(text))) => entries.push(ThreadMessage::user(text.clone())),
        (Role::Assistant, Some(MessageContent::Text(text))) => {
            entries.push(ThreadMessage::assistant(text.clone()));
        }
        (_, Some(MessageContent::Blocks(blocks))) => {
            let text = message.text();
            if message.role == Role::Assistant && !text.is_empty() {
                entries.push(ThreadMessage::assistant(text));
            }
            for block in blocks {
                match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        entries.push(ThreadMessage::tool_call(id.clone(), name.clone(), input.to_string()));
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => entries.push(ThreadMessage::tool_result(
                        tool_use_id.clone(),
                        tool_names(tool_use_id),
                        content.clone(),
                        is_error.unwrap_or(false),
                    )),
                    ContentBlock::Text { .. } => {}
                }
            }
        }
        _ => {}
    }
    entries
}

/// Convert a completed exchange into thread entries
///
/// Tool result entries are labelled with the name of the tool whose call
/// they answer.
pub fn exchange_to_thread(exchange: &[Message]) -> Vec<ThreadMessage> {
    let names: HashMap<&str, &str> = exchange
        .iter()
        .flat_map(Message::tool_uses)
        .map(|u| (u.id, u.name))
        .collect();
    let lookup = |id: &str| names.get(id).map(|n| (*n).to_string()).unwrap_or_default();

    exchange.iter().flat_map(|m| to_thread(m, &lookup)).collect()
}
