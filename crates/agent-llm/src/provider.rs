//! LLM provider trait definition

use crate::completion::response_events;
use crate::{CompletionRequest, CompletionResponse, CompletionStream, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to a chat-completion model.
/// Providers are shared by every agent built on them and must tolerate
/// concurrent calls.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages, tools, and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion as a stream of incremental events
    ///
    /// The default implementation performs a buffered call and replays it as
    /// a single text delta followed by the tool calls and a `Done` event.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let response = self.complete(request).await?;
        let events = response_events(response).into_iter().map(Ok);
        Ok(Box::pin(futures::stream::iter(events)))
    }

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;
}
