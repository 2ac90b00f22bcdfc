//! Scripted provider for tests
//!
//! [`ScriptedProvider`] answers completion requests from a queue of canned
//! replies, or from a responder closure once the queue is empty, and records
//! every request it receives. Streaming calls split text replies into
//! word-sized deltas so consumers see more than one fragment.

use crate::{
    CompletionRequest, CompletionResponse, CompletionStream, ContentBlock, LLMError, LLMProvider,
    Message, Result, StopReason, StreamEvent, TokenUsage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync>;

enum Reply {
    Response(CompletionResponse),
    Error(String),
}

/// Provider that replays a fixed script
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Reply>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    /// Create a provider with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text answer
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Response(text_response(text)))
    }

    /// Queue a single tool call
    pub fn then_tool_call(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        self.push(Reply::Response(tool_call_response(vec![(
            id.into(),
            name.into(),
            input,
        )])))
    }

    /// Queue an arbitrary response
    pub fn then_response(self, response: CompletionResponse) -> Self {
        self.push(Reply::Response(response))
    }

    /// Queue a provider failure
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.push(Reply::Error(message.into()))
    }

    /// Answer with `responder` once the script is exhausted
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Wait this long before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of completion calls made so far
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(self, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    async fn next_reply(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let outcome = match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(message)) => Err(LLMError::RequestFailed(message)),
            None => match &self.responder {
                Some(responder) => responder(&request),
                None => Err(LLMError::RequestFailed("script exhausted".to_string())),
            },
        };

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        outcome
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.next_reply(request).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let response = self.next_reply(request).await?;

        let mut events: Vec<StreamEvent> = response
            .message
            .text()
            .split_inclusive(' ')
            .map(|word| StreamEvent::TextDelta(word.to_string()))
            .collect();
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

        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A final text answer
pub fn text_response(text: impl Into<String>) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

/// A response requesting the given `(id, name, input)` tool calls in order
pub fn tool_call_response(calls: Vec<(String, String, serde_json::Value)>) -> CompletionResponse {
    let blocks = calls
        .into_iter()
        .map(|(id, name, input)| ContentBlock::ToolUse { id, name, input })
        .collect();
    CompletionResponse {
        message: Message::assistant_blocks(blocks),
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    }
}

/// Text of the last user message in a request
pub fn last_user_text(request: &CompletionRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == crate::Role::User && !m.text().is_empty())
        .map(Message::text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamAccumulator;
    use futures::StreamExt;
    use serde_json::json;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::builder("scripted")
            .add_message(Message::user(text))
            .build()
    }

    #[tokio::test]
    async fn test_replays_script_in_order() {
        let provider = ScriptedProvider::new()
            .then_tool_call("c1", "current_utc_time", json!({}))
            .then_text("done");

        let first = provider.complete(request("a")).await.unwrap();
        assert_eq!(first.stop_reason, StopReason::ToolUse);
        let second = provider.complete(request("b")).await.unwrap();
        assert_eq!(second.message.text(), "done");
        assert!(provider.complete(request("c")).await.is_err());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_responder_after_script() {
        let provider = ScriptedProvider::new()
            .with_responder(|req| Ok(text_response(last_user_text(req).to_uppercase())));

        let response = provider.complete(request("hello")).await.unwrap();
        assert_eq!(response.message.text(), "HELLO");
    }

    #[tokio::test]
    async fn test_stream_splits_words() {
        let provider = ScriptedProvider::new().then_text("one two three");
        let events: Vec<_> = provider
            .complete_stream(request("x"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        let mut acc = StreamAccumulator::new();
        for event in &events {
            acc.push(event.as_ref().unwrap());
        }
        assert_eq!(acc.finish().message.text(), "one two three");
    }
}
