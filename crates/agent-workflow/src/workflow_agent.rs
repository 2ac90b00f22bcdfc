//! Workflow agent implementation (a built workflow exposed as an agent)

use crate::{HandoffTemplate, StreamRelay, WorkflowStep};
use agent_core::{
    Agent, AgentResult, ConversationThread, Error, MessageRole, Result, RunContext,
    SegmentStream, StreamSegment, ThreadMessage,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of running every stage once
#[derive(Debug, Clone)]
pub(crate) struct StagesOutcome {
    /// Output of the final stage
    pub text: String,
    /// Leaf agent that produced the final output
    pub author_agent_id: String,
    /// Attributed messages of all stages (buffered runs only)
    pub messages: Vec<ThreadMessage>,
}

pub(crate) enum StageEvent {
    Segment(StreamSegment),
    Completed(StagesOutcome),
}

/// A sequential workflow that satisfies the [`Agent`] contract
///
/// Built by [`SequentialWorkflow::builder`](crate::SequentialWorkflow::builder).
/// Because it is an agent, it can be nested as a stage of another workflow.
///
/// Stages never share a conversation thread. A thread passed to `run` is
/// owned by the workflow itself and records the request and the final answer
/// of each successful turn. Its earlier turns are written ahead of the new
/// input as a transcript, so every stage sees them as part of the request.
/// Per-stage memory is provided by [`WorkflowSession`](crate::WorkflowSession).
pub struct WorkflowAgent {
    id: String,
    name: String,
    description: String,
    steps: Vec<WorkflowStep>,
    handoff: HandoffTemplate,
}

impl std::fmt::Debug for WorkflowAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowAgent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl WorkflowAgent {
    pub(crate) fn new(
        name: String,
        description: String,
        steps: Vec<WorkflowStep>,
        handoff: HandoffTemplate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            steps,
            handoff,
        }
    }

    /// Stages in execution order
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Number of stages
    pub fn stage_count(&self) -> usize {
        self.steps.len()
    }

    /// Template composing each stage's input
    pub fn handoff(&self) -> &HandoffTemplate {
        &self.handoff
    }

    /// Stream the workflow through a [`StreamRelay`]
    ///
    /// Dropping the relay before it is exhausted cancels `ctx`.
    pub fn relay<'a>(&'a self, input: String, ctx: &'a RunContext) -> StreamRelay<'a> {
        StreamRelay::new(
            self.run_streaming(input, None, ctx),
            ctx.cancellation_token().clone(),
        )
    }

    fn stage_input(
        &self,
        request: &str,
        stage_index: usize,
        previous: Option<&(String, String)>,
    ) -> Result<String> {
        match previous {
            None => Ok(request.to_string()),
            Some((previous_agent, previous_output)) => {
                self.handoff
                    .render(request, previous_output, previous_agent, stage_index)
            }
        }
    }

    fn stage_failed(&self, stage_index: usize, step: &WorkflowStep, err: Error) -> Error {
        if err.is_cancelled() {
            info!(workflow = %self.name, stage_index, stage = %step.name(), "Workflow cancelled");
            return Error::Cancelled;
        }
        warn!(
            workflow = %self.name,
            stage_index,
            stage = %step.name(),
            error = %err,
            "Workflow stage failed"
        );
        Error::WorkflowStageFailed {
            stage_index,
            stage: step.name().to_string(),
            cause: Box::new(err),
        }
    }

    /// Run every stage in order, buffering each stage's output
    ///
    /// With `threads`, stage `i` runs against `threads[i]`.
    pub(crate) async fn run_stages(
        &self,
        request: &str,
        mut threads: Option<&mut [ConversationThread]>,
        ctx: &RunContext,
    ) -> Result<StagesOutcome> {
        let mut previous: Option<(String, String)> = None;
        let mut messages = Vec::new();
        let mut author_agent_id = self.id.clone();

        for (stage_index, step) in self.steps.iter().enumerate() {
            ctx.ensure_active()?;
            let input = self
                .stage_input(request, stage_index, previous.as_ref())
                .map_err(|e| self.stage_failed(stage_index, step, e))?;

            info!(
                workflow = %self.name,
                stage_index,
                stage = %step.name(),
                input_length = input.len(),
                "Starting workflow stage"
            );
            let start = Instant::now();

            let stage_ctx = ctx.child();
            let thread = threads.as_deref_mut().and_then(|t| t.get_mut(stage_index));
            let result = step
                .agent()
                .run(input, thread, &stage_ctx)
                .await
                .map_err(|e| self.stage_failed(stage_index, step, e))?;

            info!(
                workflow = %self.name,
                stage_index,
                stage = %step.name(),
                output_length = result.text.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Workflow stage completed"
            );

            let mut stage_messages = result.messages;
            for message in &mut stage_messages {
                message
                    .author_agent_id
                    .get_or_insert_with(|| result.agent_id.clone());
            }
            author_agent_id = stage_messages
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant)
                .and_then(|m| m.author_agent_id.clone())
                .unwrap_or_else(|| result.agent_id.clone());
            messages.extend(stage_messages);
            previous = Some((step.name().to_string(), result.text));
        }

        Ok(StagesOutcome {
            text: previous.map(|(_, output)| output).unwrap_or_default(),
            author_agent_id,
            messages,
        })
    }

    /// Run every stage in order, forwarding the current stage's segments live
    ///
    /// The handoff uses the text produced since the last attribution change,
    /// which for a nested workflow is the output of its final stage.
    pub(crate) fn stream_stages<'a>(
        &'a self,
        request: String,
        threads: Option<&'a mut [ConversationThread]>,
        ctx: &'a RunContext,
    ) -> BoxStream<'a, Result<StageEvent>> {
        Box::pin(try_stream! {
            let mut threads = threads;
            let mut previous: Option<(String, String)> = None;
            let mut author_agent_id = self.id.clone();

            for (stage_index, step) in self.steps.iter().enumerate() {
                ctx.ensure_active()?;
                let input = self
                    .stage_input(&request, stage_index, previous.as_ref())
                    .map_err(|e| self.stage_failed(stage_index, step, e))?;

                info!(
                    workflow = %self.name,
                    stage_index,
                    stage = %step.name(),
                    input_length = input.len(),
                    "Streaming workflow stage"
                );

                let stage_ctx = ctx.child();
                let thread = threads.as_deref_mut().and_then(|t| t.get_mut(stage_index));
                let mut segments = step.agent().run_streaming(input, thread, &stage_ctx);

                let mut output = String::new();
                let mut producer: Option<String> = None;
                while let Some(segment) = segments.next().await {
                    let segment = segment.map_err(|e| self.stage_failed(stage_index, step, e))?;
                    if producer.as_deref() != Some(segment.agent_id.as_str()) {
                        output.clear();
                        producer = Some(segment.agent_id.clone());
                    }
                    output.push_str(&segment.text);
                    yield StageEvent::Segment(segment);
                }
                drop(segments);

                debug!(
                    workflow = %self.name,
                    stage_index,
                    output_length = output.len(),
                    "Workflow stage stream finished"
                );
                author_agent_id = producer.unwrap_or_else(|| step.agent().id().to_string());
                previous = Some((step.name().to_string(), output));
            }

            yield StageEvent::Completed(StagesOutcome {
                text: previous.map(|(_, output)| output).unwrap_or_default(),
                author_agent_id,
                messages: Vec::new(),
            });
        })
    }

    fn commit(&self, thread: Option<&mut ConversationThread>, input: String, outcome: &StagesOutcome) {
        if let Some(thread) = thread {
            thread.commit([
                ThreadMessage::user(input),
                ThreadMessage::assistant(outcome.text.clone())
                    .with_author(outcome.author_agent_id.clone()),
            ]);
        }
    }
}

/// Prefix `input` with the user and assistant turns already in `thread`
fn contextual_request(thread: Option<&ConversationThread>, input: &str) -> String {
    let transcript: Vec<String> = thread
        .map(ConversationThread::history)
        .unwrap_or_default()
        .iter()
        .filter_map(|message| match message.role {
            MessageRole::User => Some(format!("User: {}", message.content)),
            MessageRole::Assistant => Some(format!("Assistant: {}", message.content)),
            MessageRole::ToolCall | MessageRole::ToolResult => None,
        })
        .collect();

    if transcript.is_empty() {
        return input.to_string();
    }
    format!(
        "Conversation so far:\n{}\n\nCurrent request:\n{input}",
        transcript.join("\n")
    )
}

#[async_trait]
impl Agent for WorkflowAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(
        &self,
        input: String,
        mut thread: Option<&mut ConversationThread>,
        ctx: &RunContext,
    ) -> Result<AgentResult> {
        if let Some(thread) = thread.as_deref_mut() {
            thread.claim(&self.id)?;
        }

        info!(workflow = %self.name, stages = self.steps.len(), "Starting workflow");
        let request = contextual_request(thread.as_deref(), &input);
        let outcome = self.run_stages(&request, None, ctx).await?;
        self.commit(thread, input, &outcome);

        Ok(AgentResult {
            agent_id: self.id.clone(),
            text: outcome.text,
            messages: outcome.messages,
        })
    }

    fn run_streaming<'a>(
        &'a self,
        input: String,
        thread: Option<&'a mut ConversationThread>,
        ctx: &'a RunContext,
    ) -> SegmentStream<'a> {
        Box::pin(try_stream! {
            let mut thread = thread;
            if let Some(thread) = thread.as_deref_mut() {
                thread.claim(&self.id)?;
            }

            info!(workflow = %self.name, stages = self.steps.len(), "Starting streamed workflow");
            let request = contextual_request(thread.as_deref(), &input);
            let mut events = self.stream_stages(request, None, ctx);
            while let Some(event) = events.next().await {
                match event? {
                    StageEvent::Segment(segment) => yield segment,
                    StageEvent::Completed(outcome) => {
                        self.commit(thread.as_deref_mut(), input.clone(), &outcome);
                    }
                }
            }
        })
    }
}
