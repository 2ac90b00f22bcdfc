//! Multi-turn workflow sessions with per-stage memory

use crate::WorkflowAgent;
use crate::workflow_agent::StageEvent;
use agent_core::{Agent, AgentResult, ConversationThread, Result, RunContext, SegmentStream};
use async_stream::try_stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

/// A workflow plus one conversation thread per stage
///
/// Each stage keeps its own memory across turns; stages still never read
/// each other's threads. A turn is committed to the stage threads only when
/// every stage succeeded. A failed or cancelled turn leaves all of them
/// exactly as they were.
#[derive(Debug)]
pub struct WorkflowSession {
    workflow: Arc<WorkflowAgent>,
    threads: Vec<ConversationThread>,
}

impl WorkflowSession {
    /// Start a session with empty stage threads
    pub fn new(workflow: Arc<WorkflowAgent>) -> Self {
        let threads = (0..workflow.stage_count())
            .map(|_| ConversationThread::new())
            .collect();
        Self { workflow, threads }
    }

    /// The workflow this session runs
    pub fn workflow(&self) -> &Arc<WorkflowAgent> {
        &self.workflow
    }

    /// Stage threads, in stage order
    pub fn threads(&self) -> &[ConversationThread] {
        &self.threads
    }

    /// Thread of one stage
    pub fn stage_thread(&self, stage_index: usize) -> Option<&ConversationThread> {
        self.threads.get(stage_index)
    }

    /// Run one turn through every stage
    pub async fn run(&mut self, input: String, ctx: &RunContext) -> Result<AgentResult> {
        let mut staged = self.threads.clone();
        let outcome = self
            .workflow
            .run_stages(&input, Some(staged.as_mut_slice()), ctx)
            .await?;

        self.threads = staged;
        debug!(workflow = %self.workflow.name(), "Committed session turn");

        Ok(AgentResult {
            agent_id: self.workflow.id().to_string(),
            text: outcome.text,
            messages: outcome.messages,
        })
    }

    /// Run one turn, streaming the current stage's output
    ///
    /// Stage threads are updated once the stream has been driven to the end.
    pub fn run_streaming<'a>(&'a mut self, input: String, ctx: &'a RunContext) -> SegmentStream<'a> {
        Box::pin(try_stream! {
            let mut staged = self.threads.clone();
            let mut completed = false;
            {
                let mut events = self
                    .workflow
                    .stream_stages(input, Some(staged.as_mut_slice()), ctx);
                while let Some(event) = events.next().await {
                    match event? {
                        StageEvent::Segment(segment) => yield segment,
                        StageEvent::Completed(_) => completed = true,
                    }
                }
            }
            if completed {
                self.threads = staged;
            }
        })
    }
}
