//! Completion request and response types

use crate::{ContentBlock, Message, MessageContent, Result, Role, ToolDefinition};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Request for LLM completion with full conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Conversation history (alternating user/assistant messages)
    pub messages: Vec<Message>,

    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Sampling temperature (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Tools available for the LLM to call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message from the assistant
    pub message: Message,

    /// Stop reason (completed, max_tokens, tool_use, etc.)
    pub stop_reason: StopReason,

    /// Token usage statistics
    pub usage: TokenUsage,
}

/// Reason the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural completion (end of turn)
    EndTurn,

    /// Hit max tokens limit
    MaxTokens,

    /// Tool use requested
    ToolUse,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: usize,

    /// Number of output tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Incremental event from a streaming completion
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of assistant text
    TextDelta(String),

    /// A fully assembled tool call
    ToolUse {
        /// Call identifier
        id: String,
        /// Tool name
        name: String,
        /// Parsed arguments
        input: serde_json::Value,
    },

    /// End of the response
    Done {
        /// Why generation stopped
        stop_reason: StopReason,
        /// Usage, when the provider reports it
        usage: TokenUsage,
    },
}

/// Stream of completion events
pub type CompletionStream = BoxStream<'static, Result<StreamEvent>>;

/// Folds stream events back into a [`CompletionResponse`]
///
/// Text deltas are concatenated and tool calls kept in arrival order, so the
/// finished response is identical to what a buffered call would return.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    tool_uses: Vec<ContentBlock>,
    stop_reason: Option<StopReason>,
    usage: TokenUsage,
}

impl StreamAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event
    pub fn push(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta(delta) => self.text.push_str(delta),
            StreamEvent::ToolUse { id, name, input } => self.tool_uses.push(ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            StreamEvent::Done { stop_reason, usage } => {
                self.stop_reason = Some(*stop_reason);
                self.usage = *usage;
            }
        }
    }

    /// Build the response seen so far
    ///
    /// A stream that ended without a `Done` event is treated as a natural
    /// end of turn, or as a tool-use stop if it carried tool calls.
    pub fn finish(self) -> CompletionResponse {
        let stop_reason = self.stop_reason.unwrap_or(if self.tool_uses.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        });

        let content = if self.tool_uses.is_empty() {
            MessageContent::Text(self.text)
        } else {
            let mut blocks = Vec::with_capacity(self.tool_uses.len() + 1);
            if !self.text.is_empty() {
                blocks.push(ContentBlock::Text { text: self.text });
            }
            blocks.extend(self.tool_uses);
            MessageContent::Blocks(blocks)
        };

        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(content),
            },
            stop_reason,
            usage: self.usage,
        }
    }
}

/// Split a buffered response into the events a streaming call would emit
pub fn response_events(response: CompletionResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let text = response.message.text();
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta(text));
    }
    for tool_use in response.message.tool_uses() {
        events.push(StreamEvent::ToolUse {
            id: tool_use.id.to_string(),
            name: tool_use.name.to_string(),
            input: tool_use.input.clone(),
        });
    }
    events.push(StreamEvent::Done {
        stop_reason: response.stop_reason,
        usage: response.usage,
    });
    events
}

impl CompletionRequest {
    /// Create a builder for completion requests
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }
}

/// Builder for CompletionRequest
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<Message>,
    system: Option<String>,
    max_tokens: usize,
    temperature: Option<f32>,
    tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequestBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            max_tokens: 4096,
            temperature: None,
            tools: None,
        }
    }

    /// Set the conversation messages
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a single message
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the available tools; an empty list sends none
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Build the completion request
    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            messages: self.messages,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: self.tools,
        }
    }
}
