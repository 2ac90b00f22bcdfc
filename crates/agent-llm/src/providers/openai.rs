//! OpenAI provider implementation
//!
//! This module implements the LLMProvider trait for the OpenAI chat
//! completions API and for Azure OpenAI deployments, which speak the same
//! protocol with a different URL layout and auth header.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! # Examples
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, Message, LLMProvider};
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenAIProvider::with_config(OpenAIConfig::new("sk-..."))?;
//!
//!     let request = CompletionRequest::builder("gpt-4o-mini")
//!         .add_message(Message::user("Hello!"))
//!         .max_tokens(100)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Azure OpenAI
//!
//! ```no_run
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OpenAIConfig::new("your-azure-key")
//!     .with_api_base("https://YOUR_RESOURCE.openai.azure.com")
//!     .with_azure_api_version("2024-10-21");
//!
//! let provider = OpenAIProvider::with_config(config)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, CompletionStream, ContentBlock, LLMError, LLMProvider,
    Message, MessageContent, Result, Role, StopReason, StreamEvent, TokenUsage, ToolDefinition,
};
use agent_utils::ModelSettings;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Highest tool-call slot a streamed response may address
const MAX_STREAMED_TOOL_CALLS: usize = 128;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication; empty for endpoints that need none
    pub api_key: String,

    /// Base URL for the API (default: "https://api.openai.com/v1")
    ///
    /// For Azure this is the resource URL, optionally already including
    /// `/openai/deployments/<name>`.
    pub api_base: String,

    /// Azure `api-version`; switches the provider to Azure conventions
    pub api_version: Option<String>,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build a config from loaded application settings
    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.clone(),
            api_version: settings.api_version.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }

    /// Set custom API base URL
    ///
    /// Useful for:
    /// - Azure OpenAI: "https://YOUR_RESOURCE.openai.azure.com"
    /// - Local deployments: "http://localhost:8000/v1"
    /// - Other OpenAI-compatible APIs
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Talk to Azure OpenAI with the given `api-version`
    pub fn with_azure_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Whether requests follow Azure conventions
    pub fn is_azure(&self) -> bool {
        self.api_version.is_some()
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// OpenAI provider
///
/// Works with OpenAI, Azure OpenAI and any OpenAI-compatible endpoint.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "api_base must not be empty".to_string(),
            ));
        }

        // Buffered requests get a total timeout per call; streamed bodies are
        // bounded by the idle timeout in `decode_events`.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new OpenAI provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from loaded application settings
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        Self::with_config(OpenAIConfig::from_settings(settings))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Chat completions URL for `model`
    fn endpoint(&self, model: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if self.config.is_azure() && !base.contains("/deployments/") {
            format!("{base}/openai/deployments/{model}/chat/completions")
        } else {
            format!("{base}/chat/completions")
        }
    }

    fn build_body(&self, request: CompletionRequest, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: request.model,
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    fn post(&self, body: &OpenAIRequest) -> RequestBuilder {
        let mut builder = self.client.post(self.endpoint(&body.model)).json(body);

        if let Some(version) = &self.config.api_version {
            builder = builder
                .query(&[("api-version", version.as_str())])
                .header("api-key", &self.config.api_key);
        } else if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        builder
    }

    async fn check_status(response: Response, model: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await?;
        Err(match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed,
            429 => LLMError::RateLimitExceeded(error_text),
            400 => LLMError::InvalidRequest(error_text),
            404 => LLMError::ModelNotFound(model.to_string()),
            _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending completion request to {}", self.config.api_base);

        let model = request.model.clone();
        let body = self.build_body(request, false);
        let response = self
            .post(&body)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;
        let response = Self::check_status(response, &model).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = openai_response.usage.map(TokenUsage::from).unwrap_or_default();
        debug!(
            "Received response - stop_reason: {}, tokens: {}/{}",
            choice.finish_reason.as_deref().unwrap_or("none"),
            usage.input_tokens,
            usage.output_tokens
        );

        Ok(CompletionResponse {
            message: parse_openai_response(choice.message),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref().unwrap_or("stop")),
            usage,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        debug!("Opening completion stream to {}", self.config.api_base);

        let model = request.model.clone();
        let body = self.build_body(request, true);
        let response = self
            .post(&body)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response, &model).await?;

        let events = response.bytes_stream().eventsource();
        Ok(decode_events(
            events,
            Duration::from_secs(self.config.timeout_secs),
        ))
    }

    fn name(&self) -> &'static str {
        if self.config.is_azure() { "azure-openai" } else { "openai" }
    }
}

// ============================================================================
// OpenAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &'static str, text: String) -> Self {
        Self {
            role,
            content: Some(text),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

// ============================================================================
// OpenAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    id: String,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl From<OpenAIUsage> for TokenUsage {
    fn from(usage: OpenAIUsage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}

// ============================================================================
// Streaming chunk types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    usage: Option<OpenAIUsage>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDeltaToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<OpenAIDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDeltaFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles streamed chunks into [`StreamEvent`]s
///
/// Text is forwarded as soon as it arrives. Tool call fragments are keyed by
/// their index and only emitted once the stream ends, when the argument JSON
/// is complete.
/// Turn server-sent events into completion events
///
/// Fails with [`LLMError::StreamError`] when no event arrives for `idle`.
fn decode_events<S, E>(mut events: S, idle: Duration) -> CompletionStream
where
    S: futures::Stream<Item = std::result::Result<eventsource_stream::Event, E>>
        + Send
        + Unpin
        + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut state = StreamState::default();
        loop {
            let next = tokio::time::timeout(idle, events.next()).await.map_err(|_| {
                warn!(idle_secs = idle.as_secs_f64(), "Completion stream stalled");
                LLMError::StreamError(format!(
                    "no data received for {:.1}s",
                    idle.as_secs_f64()
                ))
            })?;
            let Some(event) = next else {
                break;
            };
            let event = event.map_err(|e| LLMError::StreamError(e.to_string()))?;
            if event.data.trim() == "[DONE]" {
                break;
            }
            for item in state.apply(&event.data)? {
                yield item;
            }
        }
        for item in state.finish() {
            yield item;
        }
    })
}

#[derive(Debug, Default)]
struct StreamState {
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<String>,
    usage: TokenUsage,
}

impl StreamState {
    fn apply(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: OpenAIStreamChunk = serde_json::from_str(data)?;

        if let Some(error) = chunk.error {
            return Err(LLMError::StreamError(stream_error_message(&error)));
        }
        if let Some(usage) = chunk.usage {
            self.usage = usage.into();
        }

        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content
                && !content.is_empty()
            {
                events.push(StreamEvent::TextDelta(content));
            }

            for call in choice.delta.tool_calls.unwrap_or_default() {
                if call.index >= MAX_STREAMED_TOOL_CALLS {
                    return Err(LLMError::UnexpectedResponse(format!(
                        "tool call index {} exceeds the limit of {MAX_STREAMED_TOOL_CALLS}",
                        call.index
                    )));
                }
                if self.tool_calls.len() <= call.index {
                    self.tool_calls.resize_with(call.index + 1, PartialToolCall::default);
                }
                let partial = &mut self.tool_calls[call.index];
                if let Some(id) = call.id {
                    partial.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }

        Ok(events)
    }

    fn finish(self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(self.tool_calls.len() + 1);
        for call in self.tool_calls {
            if call.name.is_empty() {
                warn!("Dropping streamed tool call without a name (id: {})", call.id);
                continue;
            }
            events.push(StreamEvent::ToolUse {
                input: parse_arguments(&call.name, &call.arguments),
                id: call.id,
                name: call.name,
            });
        }

        let has_tool_calls = events.iter().any(|e| matches!(e, StreamEvent::ToolUse { .. }));
        let stop_reason = match self.finish_reason.as_deref() {
            Some(reason) => map_stop_reason(reason),
            None if has_tool_calls => StopReason::ToolUse,
            None => StopReason::EndTurn,
        };
        events.push(StreamEvent::Done {
            stop_reason,
            usage: self.usage,
        });
        events
    }
}

fn stream_error_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| error.as_str())
        .map_or_else(|| error.to_string(), str::to_string)
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build OpenAI messages from our generic format
///
/// The system prompt goes first in the messages array.
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage::text("system", sys));
    }

    for msg in messages {
        result.extend(convert_message(msg));
    }

    result
}

/// Convert a single message to OpenAI format
///
/// This may return multiple OpenAI messages (tool results become separate
/// `tool` messages).
fn convert_message(msg: Message) -> Vec<OpenAIMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    match msg.content {
        Some(MessageContent::Text(text)) => vec![OpenAIMessage::text(role, text)],
        Some(MessageContent::Blocks(blocks)) => convert_blocks(role, blocks),
        None => vec![OpenAIMessage::text(role, String::new())],
    }
}

/// Convert content blocks to OpenAI messages
fn convert_blocks(role: &'static str, blocks: Vec<ContentBlock>) -> Vec<OpenAIMessage> {
    let mut messages = Vec::new();
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: part } => text.push_str(&part),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(OpenAIToolCall {
                id,
                tool_type: "function",
                function: OpenAIFunctionCall {
                    name,
                    arguments: match input {
                        serde_json::Value::String(raw) => raw,
                        other => other.to_string(),
                    },
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => messages.push(OpenAIMessage {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
        }
    }

    if !text.is_empty() || !tool_calls.is_empty() {
        messages.insert(
            0,
            OpenAIMessage {
                role,
                content: (!text.is_empty()).then_some(text),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            },
        );
    }

    messages
}

/// Convert tool definitions to OpenAI format
fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function",
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Parse tool call arguments; an empty string means no arguments
///
/// Arguments that are not valid JSON are kept as the raw string. Tool
/// argument validation rejects them, and the model gets that error back as
/// the tool result.
fn parse_arguments(tool: &str, arguments: &str) -> serde_json::Value {
    if arguments.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(arguments).unwrap_or_else(|e| {
        warn!(tool_name = %tool, error = %e, "Model sent malformed tool arguments");
        serde_json::Value::String(arguments.to_string())
    })
}

/// Parse OpenAI response message to our format
fn parse_openai_response(msg: OpenAIResponseMessage) -> Message {
    let text = msg.content.unwrap_or_default();
    let Some(tool_calls) = msg.tool_calls.filter(|calls| !calls.is_empty()) else {
        return Message::assistant(text);
    };

    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
    if !text.is_empty() {
        blocks.push(ContentBlock::Text { text });
    }
    for call in tool_calls {
        blocks.push(ContentBlock::ToolUse {
            input: parse_arguments(&call.function.name, &call.function.arguments),
            id: call.id,
            name: call.function.name,
        });
    }

    Message::assistant_blocks(blocks)
}

/// Map OpenAI stop reason to our format
fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "content_filter" => {
            debug!("Content filtered by provider safety systems");
            StopReason::EndTurn
        }
        _ => {
            debug!("Unknown stop reason: {}", reason);
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, "https://api.openai.com/v1");
        assert_eq!(
            provider.endpoint("gpt-4o-mini"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_empty_api_base_rejected() {
        let result = OpenAIProvider::with_config(OpenAIConfig::new("k").with_api_base("  "));
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_settings() {
        let settings = ModelSettings {
            api_base: "http://localhost:1234/v1/".to_string(),
            api_key: String::new(),
            model: "local-model".to_string(),
            api_version: None,
            timeout_secs: 30,
        };

        let provider = OpenAIProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.config().timeout_secs, 30);
        assert_eq!(
            provider.endpoint("local-model"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_azure_endpoint() {
        let config = OpenAIConfig::new("azure-key")
            .with_api_base("https://res.openai.azure.com/")
            .with_azure_api_version("2024-10-21");
        let provider = OpenAIProvider::with_config(config).unwrap();

        assert_eq!(provider.name(), "azure-openai");
        assert_eq!(
            provider.endpoint("gpt-4o"),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions"
        );

        let config = OpenAIConfig::new("azure-key")
            .with_api_base("https://res.openai.azure.com/openai/deployments/prod")
            .with_azure_api_version("2024-10-21");
        let provider = OpenAIProvider::with_config(config).unwrap();
        assert_eq!(
            provider.endpoint("ignored"),
            "https://res.openai.azure.com/openai/deployments/prod/chat/completions"
        );
    }

    #[test]
    fn test_simple_text_message_conversion() {
        let openai_msgs = convert_message(Message::user("Hello"));

        assert_eq!(openai_msgs.len(), 1);
        assert_eq!(openai_msgs[0].role, "user");
        assert_eq!(openai_msgs[0].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_system_message_in_array() {
        let messages = build_openai_messages(Some("You are helpful".to_string()), vec![]);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("You are helpful"));
    }

    #[test]
    fn test_tool_definition_conversion() {
        let tool = ToolDefinition::new(
            "web_search",
            "Search the web",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        );

        let openai_tools = convert_tools(&[tool]);

        assert_eq!(openai_tools.len(), 1);
        assert_eq!(openai_tools[0].tool_type, "function");
        assert_eq!(openai_tools[0].function.name, "web_search");
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_stop_reason("content_filter"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("unknown"), StopReason::EndTurn);
    }

    #[test]
    fn test_assistant_tool_calls_and_results() {
        let assistant = Message::assistant_blocks(vec![ContentBlock::ToolUse {
            id: "call_1".to_string(),
            name: "stock_price".to_string(),
            input: json!({"symbol": "MSFT"}),
        }]);
        let converted = convert_message(assistant);
        assert_eq!(converted.len(), 1);
        assert!(converted[0].content.is_none());
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"symbol":"MSFT"}"#);

        let result = convert_message(Message::tool_error("call_1".to_string(), "boom".to_string()));
        assert_eq!(result[0].role, "tool");
        assert_eq!(result[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response_msg = OpenAIResponseMessage {
            content: Some("Let me search for that".to_string()),
            tool_calls: Some(vec![OpenAIResponseToolCall {
                id: "call_123".to_string(),
                function: OpenAIResponseFunctionCall {
                    name: "web_search".to_string(),
                    arguments: r#"{"query":"test"}"#.to_string(),
                },
            }]),
        };

        let message = parse_openai_response(response_msg);
        assert_eq!(message.text(), "Let me search for that");
        let uses = message.tool_uses();
        assert_eq!(uses[0].id, "call_123");
        assert_eq!(uses[0].input["query"], "test");
    }

    #[test]
    fn test_response_without_arguments() {
        let message = parse_openai_response(OpenAIResponseMessage {
            content: None,
            tool_calls: Some(vec![OpenAIResponseToolCall {
                id: "call_1".to_string(),
                function: OpenAIResponseFunctionCall {
                    name: "current_utc_time".to_string(),
                    arguments: String::new(),
                },
            }]),
        });
        assert_eq!(message.tool_uses()[0].input, &json!({}));
    }

    #[test]
    fn test_stream_state_text_and_usage() {
        let mut state = StreamState::default();
        let first = state
            .apply(r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#)
            .unwrap();
        let second = state
            .apply(r#"{"choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#)
            .unwrap();
        state
            .apply(r#"{"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2}}"#)
            .unwrap();

        assert_eq!(first, vec![StreamEvent::TextDelta("Hel".to_string())]);
        assert_eq!(second, vec![StreamEvent::TextDelta("lo".to_string())]);
        assert_eq!(
            state.finish(),
            vec![StreamEvent::Done {
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 5,
                    output_tokens: 2
                },
            }]
        );
    }

    #[test]
    fn test_stream_state_assembles_tool_calls() {
        let mut state = StreamState::default();
        let chunks = [
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","type":"function","function":{"name":"stock_price","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"symbol\":"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"current_utc_time","arguments":"{}"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"MSFT\"}"}}]},"finish_reason":"tool_calls"}]}"#,
        ];
        for chunk in chunks {
            assert!(state.apply(chunk).unwrap().is_empty());
        }

        let events = state.finish();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            StreamEvent::ToolUse {
                id: "call_a".to_string(),
                name: "stock_price".to_string(),
                input: json!({"symbol": "MSFT"}),
            }
        );
        assert!(matches!(&events[1], StreamEvent::ToolUse { name, .. } if name == "current_utc_time"));
        assert!(matches!(
            events[2],
            StreamEvent::Done {
                stop_reason: StopReason::ToolUse,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_arguments_are_kept_raw() {
        let message = parse_openai_response(OpenAIResponseMessage {
            content: None,
            tool_calls: Some(vec![OpenAIResponseToolCall {
                id: "call_1".to_string(),
                function: OpenAIResponseFunctionCall {
                    name: "stock_price".to_string(),
                    arguments: r#"{"symbol": "MSFT""#.to_string(),
                },
            }]),
        });

        let uses = message.tool_uses();
        assert_eq!(uses[0].name, "stock_price");
        assert_eq!(uses[0].input, &json!(r#"{"symbol": "MSFT""#));

        // Sent back to the endpoint exactly as the model wrote it
        let converted = convert_message(message.clone());
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"symbol": "MSFT""#);
    }

    #[test]
    fn test_stream_state_keeps_malformed_arguments() {
        let mut state = StreamState::default();
        state
            .apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"stock_price","arguments":"{\"symbol\":"}}]},"finish_reason":"tool_calls"}]}"#)
            .unwrap();

        let events = state.finish();
        assert_eq!(
            events[0],
            StreamEvent::ToolUse {
                id: "call_a".to_string(),
                name: "stock_price".to_string(),
                input: json!(r#"{"symbol":"#),
            }
        );
    }

    #[test]
    fn test_stream_state_rejects_huge_tool_index() {
        let mut state = StreamState::default();
        let err = state
            .apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":4000000000,"id":"x","function":{"name":"n"}}]}}]}"#)
            .unwrap_err();

        assert!(matches!(err, LLMError::UnexpectedResponse(_)));
        assert!(state.tool_calls.is_empty());
    }

    fn sse(data: &str) -> std::result::Result<eventsource_stream::Event, std::convert::Infallible> {
        Ok(eventsource_stream::Event {
            event: "message".to_string(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        })
    }

    #[tokio::test]
    async fn test_decode_events_until_done() {
        let events = futures::stream::iter(vec![
            sse(r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":"stop"}]}"#),
            sse("[DONE]"),
        ]);

        let decoded: Vec<_> = decode_events(events, Duration::from_secs(5))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(decoded[0], StreamEvent::TextDelta("Hi".to_string()));
        assert!(matches!(decoded[1], StreamEvent::Done { .. }));
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let events = futures::stream::iter(vec![sse(
            r#"{"choices":[{"delta":{"content":"partial"}}]}"#,
        )])
        .chain(futures::stream::pending());

        let decoded = tokio::time::timeout(
            Duration::from_secs(5),
            decode_events(events, Duration::from_millis(50)).collect::<Vec<_>>(),
        )
        .await
        .expect("idle timeout must end the stream");

        assert_eq!(decoded.len(), 2);
        assert_eq!(
            decoded[0].as_ref().unwrap(),
            &StreamEvent::TextDelta("partial".to_string())
        );
        assert!(matches!(&decoded[1], Err(LLMError::StreamError(msg)) if msg.contains("no data")));
    }

    #[test]
    fn test_stream_state_surfaces_errors() {
        let mut state = StreamState::default();
        let err = state
            .apply(r#"{"error":{"message":"deployment overloaded"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("deployment overloaded"));
    }
}
