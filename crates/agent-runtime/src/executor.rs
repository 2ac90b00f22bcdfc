//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the core agent loop pattern:
//! 1. Call LLM with conversation history and available tools
//! 2. If the response requests tools, run them in the order requested,
//!    append their results and loop back
//! 3. Otherwise return the accumulated answer
//!
//! Buffered and streaming runs share one loop; they differ only in how each
//! model response is obtained. That keeps the text of both modes identical.

use crate::AgentConfig;
use agent_core::{Error, Result, RunContext};
use agent_llm::completion::response_events;
use agent_llm::{
    CompletionRequest, CompletionStream, LLMProvider, Message, StopReason, StreamAccumulator,
    StreamEvent, ToolDefinition,
};
use agent_tools::ToolRegistry;
use async_stream::try_stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inserted between text produced by successive model calls of one turn
pub const TURN_TEXT_SEPARATOR: &str = "\n\n";

/// How model responses are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One buffered completion per model call
    Buffered,
    /// Incremental completions; text is forwarded as it arrives
    Streaming,
}

/// Result of a completed agent loop
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// All assistant text of the turn
    pub text: String,
    /// The turn's messages, starting with the user input
    pub exchange: Vec<Message>,
    /// Number of model calls made
    pub iterations: usize,
}

/// Progress of a running agent loop
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// A fragment of assistant text
    TextDelta(String),
    /// A tool call is about to run
    ToolStarted {
        /// Call identifier
        id: String,
        /// Tool name
        name: String,
    },
    /// A tool call finished
    ToolFinished {
        /// Call identifier
        id: String,
        /// Tool name
        name: String,
        /// Whether the result carries an error
        is_error: bool,
        /// Wall time of the call
        duration_ms: u64,
    },
    /// The loop finished; always the last event
    Completed(ExecutionOutcome),
}

/// Stream of executor events
pub type ExecutorStream<'a> = BoxStream<'a, Result<ExecutorEvent>>;

/// Executes an agent loop: LLM → tool calls → execution → loop back
///
/// The executor is immutable and may serve many concurrent runs; all
/// per-run state lives inside the run.
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Configuration the executor runs with
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Tools offered to the model
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Run the loop to completion
    ///
    /// # Arguments
    ///
    /// * `history` - Prior conversation, sent ahead of the input
    /// * `input` - The user's input message
    /// * `ctx` - Run context; cancellation stops the loop at the next model
    ///   or tool call
    pub async fn run(
        &self,
        history: Vec<Message>,
        input: String,
        ctx: &RunContext,
    ) -> Result<ExecutionOutcome> {
        let mut events = self.execute(history, input, ctx, ResponseMode::Buffered);
        while let Some(event) = events.next().await {
            if let ExecutorEvent::Completed(outcome) = event? {
                return Ok(outcome);
            }
        }
        Err(Error::ModelUnavailable(
            "agent loop ended without an answer".to_string(),
        ))
    }

    /// Run the loop, reporting progress as a stream
    ///
    /// The stream ends with [`ExecutorEvent::Completed`] or with an error.
    /// Dropping it early abandons the run.
    pub fn execute<'a>(
        &'a self,
        history: Vec<Message>,
        input: String,
        ctx: &'a RunContext,
        mode: ResponseMode,
    ) -> ExecutorStream<'a> {
        Box::pin(try_stream! {
            let mut conversation = history;
            let exchange_start = conversation.len();
            conversation.push(Message::user(input));

            let tools = self.build_tool_definitions();
            debug!(tool_count = tools.len(), "Available tools");

            let mut text = String::new();
            let mut iteration = 0;

            loop {
                ctx.ensure_active()?;

                iteration += 1;
                if iteration > self.config.max_tool_iterations {
                    warn!(
                        agent = %self.config.name,
                        max_iterations = self.config.max_tool_iterations,
                        "Tool loop cap reached without a final answer"
                    );
                    Err::<(), _>(Error::ToolLoopExceeded {
                        max_iterations: self.config.max_tool_iterations,
                    })?;
                }

                info!(
                    agent = %self.config.name,
                    iteration,
                    max_iterations = self.config.max_tool_iterations,
                    model = %self.config.model,
                    tool_count = tools.len(),
                    ?mode,
                    "Sending request to LLM"
                );

                let request = self.build_request(&conversation, &tools);
                let mut events = self.open_response(request, ctx, mode).await?;

                let mut acc = StreamAccumulator::new();
                let mut separated = text.is_empty();
                while let Some(event) = ctx.guard(events.next()).await? {
                    let event = event?;
                    if let StreamEvent::TextDelta(delta) = &event
                        && !delta.is_empty()
                    {
                        if !separated {
                            separated = true;
                            text.push_str(TURN_TEXT_SEPARATOR);
                            yield ExecutorEvent::TextDelta(TURN_TEXT_SEPARATOR.to_string());
                        }
                        text.push_str(delta);
                        yield ExecutorEvent::TextDelta(delta.clone());
                    }
                    acc.push(&event);
                }

                let response = acc.finish();
                info!(
                    stop_reason = ?response.stop_reason,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM response received"
                );
                let response_preview: String = response.message.text().chars().take(300).collect();
                debug!(response_preview = %response_preview, "LLM response content preview");

                let calls: Vec<(String, String, Value)> = response
                    .message
                    .tool_uses()
                    .into_iter()
                    .map(|u| (u.id.to_string(), u.name.to_string(), u.input.clone()))
                    .collect();
                let stop_reason = response.stop_reason;
                conversation.push(response.message);

                if calls.is_empty() {
                    if stop_reason == StopReason::MaxTokens {
                        warn!(agent = %self.config.name, "Hit max tokens in LLM response");
                    }
                    info!(
                        agent = %self.config.name,
                        iteration,
                        response_length = text.len(),
                        "Agent completed"
                    );
                    yield ExecutorEvent::Completed(ExecutionOutcome {
                        text: text.clone(),
                        exchange: conversation.split_off(exchange_start),
                        iterations: iteration,
                    });
                    break;
                }

                info!(tool_count = calls.len(), "Agent requested tool use");
                for (id, name, input) in calls {
                    let input_preview: String = input.to_string().chars().take(500).collect();
                    info!(
                        tool_name = %name,
                        tool_id = %id,
                        input_preview = %input_preview,
                        "Executing tool"
                    );
                    yield ExecutorEvent::ToolStarted { id: id.clone(), name: name.clone() };

                    let start = Instant::now();
                    let outcome = ctx.guard(self.tool_registry.invoke(&name, input)).await?;
                    let duration_ms = start.elapsed().as_millis() as u64;
                    let (content, is_error) = tool_result_content(outcome)?;

                    let result_preview: String = content.chars().take(500).collect();
                    info!(
                        tool_name = %name,
                        duration_ms,
                        is_error,
                        result_length = content.len(),
                        result_preview = %result_preview,
                        "Tool execution finished"
                    );
                    yield ExecutorEvent::ToolFinished {
                        id: id.clone(),
                        name,
                        is_error,
                        duration_ms,
                    };

                    conversation.push(if is_error {
                        Message::tool_error(id, content)
                    } else {
                        Message::tool_result(id, content)
                    });
                }
            }
        })
    }

    async fn open_response(
        &self,
        request: CompletionRequest,
        ctx: &RunContext,
        mode: ResponseMode,
    ) -> Result<CompletionStream> {
        match mode {
            ResponseMode::Streaming => Ok(ctx.guard(self.provider.complete_stream(request)).await??),
            ResponseMode::Buffered => {
                let response = ctx.guard(self.provider.complete(request)).await??;
                let events = response_events(response).into_iter().map(Ok);
                Ok(Box::pin(futures::stream::iter(events)))
            }
        }
    }

    fn build_request(&self, conversation: &[Message], tools: &[ToolDefinition]) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .system(self.config.instructions.clone())
            .max_tokens(self.config.max_tokens)
            .tools(tools.to_vec());
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        builder.build()
    }

    /// Build tool definitions from the registry
    fn build_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registry
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }
}

/// Turn a tool outcome into the text handed back to the model
///
/// Argument and implementation failures become error results so the model
/// can react to them. A call to a tool the agent does not have, and
/// cancellation, end the turn.
fn tool_result_content(outcome: Result<Value>) -> Result<(String, bool)> {
    match outcome {
        Ok(Value::String(text)) => Ok((text, false)),
        Ok(value) => Ok((value.to_string(), false)),
        Err(err @ (Error::UnknownTool(_) | Error::Cancelled)) => Err(err),
        Err(err) => Ok((format!("Error: {err}"), true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_llm::testing::{ScriptedProvider, last_user_text, text_response, tool_call_response};
    use agent_tools::ParameterSchema;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config(max_iterations: usize) -> AgentConfig {
        let mut config = AgentConfig::new("Tester", "You are a test agent.");
        config.max_tool_iterations = max_iterations;
        config
    }

    fn time_tools(calls: Arc<AtomicUsize>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("getTime", "Current time", ParameterSchema::new(), move |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("09:30"))
                }
            })
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_responder(|req| Ok(text_response(last_user_text(req).to_uppercase()))),
        );
        let executor = AgentExecutor::new(provider.clone(), Arc::new(ToolRegistry::new()), config(10));

        let outcome = executor
            .run(vec![], "hello".to_string(), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(outcome.text, "HELLO");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.exchange.len(), 2);

        let request = &provider.requests()[0];
        assert_eq!(request.system.as_deref(), Some("You are a test agent."));
        assert!(request.tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("c1", "getTime", json!({}))
                .with_responder(|req| {
                    let time = req.messages.last().map(Message::text).unwrap_or_default();
                    Ok(text_response(format!("It is {time}")))
                }),
        );
        let executor = AgentExecutor::new(provider.clone(), time_tools(calls.clone()), config(10));

        let outcome = executor
            .run(vec![], "what time is it?".to_string(), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(outcome.exchange.len(), 4);
        assert!(outcome.exchange[1].has_tool_uses());
        assert!(outcome.text.starts_with("It is"));
        let second = &provider.requests()[1];
        assert_eq!(second.tools.as_ref().unwrap()[0].name, "getTime");
    }

    #[tokio::test]
    async fn test_tool_result_text_reaches_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("c1", "getTime", json!({}))
                .with_responder(|req| {
                    let result = match &req.messages[2].content {
                        Some(agent_llm::MessageContent::Blocks(blocks)) => match &blocks[0] {
                            agent_llm::ContentBlock::ToolResult { content, .. } => content.clone(),
                            _ => String::new(),
                        },
                        _ => String::new(),
                    };
                    Ok(text_response(format!("It is {result}")))
                }),
        );
        let executor = AgentExecutor::new(provider, time_tools(calls), config(10));

        let outcome = executor
            .run(vec![], "time?".to_string(), &RunContext::new())
            .await
            .unwrap();
        assert_eq!(outcome.text, "It is 09:30");
    }

    #[tokio::test]
    async fn test_loop_cap_is_an_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(ScriptedProvider::new().with_responder(|_| {
            Ok(tool_call_response(vec![(
                "again".to_string(),
                "getTime".to_string(),
                json!({}),
            )]))
        }));
        let executor = AgentExecutor::new(provider.clone(), time_tools(calls.clone()), config(3));

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            executor.run(vec![], "loop".to_string(), &RunContext::new()),
        )
        .await
        .expect("loop must terminate")
        .unwrap_err();

        assert!(matches!(err, Error::ToolLoopExceeded { max_iterations: 3 }));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_tool_errors_are_fed_back() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("c1", "getTime", json!({ "zone": "UTC" }))
                .then_text("Sorry, I could not read the clock."),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = AgentExecutor::new(provider.clone(), time_tools(calls.clone()), config(10));

        let outcome = executor
            .run(vec![], "time?".to_string(), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.text, "Sorry, I could not read the clock.");
        match &outcome.exchange[2].content {
            Some(agent_llm::MessageContent::Blocks(blocks)) => assert!(matches!(
                &blocks[0],
                agent_llm::ContentBlock::ToolResult { is_error: Some(true), content, .. }
                    if content.contains("unexpected argument 'zone'")
            )),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_fed_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let make = || {
            Arc::new(
                ScriptedProvider::new()
                    .then_tool_call("c1", "getTime", json!(r#"{"zone": "#))
                    .then_text("Let me try that again later."),
            )
        };

        for mode in [ResponseMode::Buffered, ResponseMode::Streaming] {
            let executor = AgentExecutor::new(make(), time_tools(calls.clone()), config(10));
            let ctx = RunContext::new();
            let mut events = executor.execute(vec![], "time?".to_string(), &ctx, mode);

            let mut outcome = None;
            let mut tool_errors = 0;
            while let Some(event) = events.next().await {
                match event.unwrap() {
                    ExecutorEvent::ToolFinished { is_error: true, .. } => tool_errors += 1,
                    ExecutorEvent::Completed(done) => outcome = Some(done),
                    _ => {}
                }
            }

            let outcome = outcome.unwrap();
            assert_eq!(tool_errors, 1, "{mode:?}");
            assert_eq!(outcome.text, "Let me try that again later.");
            match &outcome.exchange[2].content {
                Some(agent_llm::MessageContent::Blocks(blocks)) => assert!(matches!(
                    &blocks[0],
                    agent_llm::ContentBlock::ToolResult { is_error: Some(true), content, .. }
                        if content.contains("not a valid JSON object")
                )),
                other => panic!("unexpected content: {other:?}"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_turn() {
        let provider = Arc::new(ScriptedProvider::new().then_tool_call("c1", "launch", json!({})));
        let executor = AgentExecutor::new(provider, Arc::new(ToolRegistry::new()), config(10));

        let err = executor
            .run(vec![], "go".to_string(), &RunContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "launch"));
    }

    #[tokio::test]
    async fn test_model_failure_is_model_unavailable() {
        let provider = Arc::new(ScriptedProvider::new().then_error("HTTP 503"));
        let executor = AgentExecutor::new(provider, Arc::new(ToolRegistry::new()), config(10));

        let err = executor
            .run(vec![], "hi".to_string(), &RunContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(msg) if msg.contains("HTTP 503")));
    }

    #[tokio::test]
    async fn test_streaming_matches_buffered() {
        let make = || {
            Arc::new(
                ScriptedProvider::new()
                    .then_response(tool_call_response(vec![(
                        "c1".to_string(),
                        "getTime".to_string(),
                        json!({}),
                    )]))
                    .then_text("The time is half past nine"),
            )
        };

        let buffered = AgentExecutor::new(make(), time_tools(Arc::default()), config(10))
            .run(vec![], "time?".to_string(), &RunContext::new())
            .await
            .unwrap();

        let executor = AgentExecutor::new(make(), time_tools(Arc::default()), config(10));
        let ctx = RunContext::new();
        let events: Vec<_> = executor
            .execute(vec![], "time?".to_string(), &ctx, ResponseMode::Streaming)
            .collect()
            .await;

        let mut deltas = 0;
        let mut streamed = String::new();
        for event in events {
            match event.unwrap() {
                ExecutorEvent::TextDelta(delta) => {
                    deltas += 1;
                    streamed.push_str(&delta);
                }
                ExecutorEvent::Completed(outcome) => assert_eq!(outcome.text, streamed),
                _ => {}
            }
        }

        assert!(deltas > 1);
        assert_eq!(streamed, buffered.text);
    }

    #[tokio::test]
    async fn test_cancelled_before_model_call() {
        let provider = Arc::new(ScriptedProvider::new().then_text("never"));
        let executor = AgentExecutor::new(provider.clone(), Arc::new(ToolRegistry::new()), config(10));
        let ctx = RunContext::new();
        ctx.cancel();

        let err = executor.run(vec![], "hi".to_string(), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }
}
