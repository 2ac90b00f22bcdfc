//! Chat agent implementation (wraps AgentExecutor)

use crate::AgentConfig;
use crate::executor::{AgentExecutor, ExecutionOutcome, ExecutorEvent, ResponseMode};
use agent_core::{
    Agent, AgentResult, ConversationThread, Error, Result, RunContext, SegmentStream,
    StreamSegment, ThreadMessage,
};
use agent_llm::messages::{exchange_to_thread, from_thread};
use agent_llm::{LLMProvider, Message};
use agent_tools::{Tool, ToolRegistry};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Leaf agent: instructions + tools + a model
///
/// A ChatAgent runs the tool-invocation loop of its [`AgentExecutor`] and
/// implements [`Agent`] on top of it. It is immutable once built and can be
/// shared across concurrent requests; conversation memory lives only in the
/// thread passed to each call.
///
/// # Example
///
/// ```no_run
/// use agent_core::{Agent, ConversationThread, RunContext};
/// use agent_runtime::ChatAgent;
/// # use std::sync::Arc;
///
/// # async fn example(provider: Arc<dyn agent_llm::LLMProvider>) -> agent_core::Result<()> {
/// let agent = ChatAgent::builder("Assistant")
///     .provider(provider)
///     .instructions("You are a helpful financial assistant.")
///     .build()?;
///
/// let mut thread = ConversationThread::new();
/// let result = agent
///     .run("Hello".to_string(), Some(&mut thread), &RunContext::new())
///     .await?;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
pub struct ChatAgent {
    id: String,
    executor: AgentExecutor,
}

impl std::fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAgent")
            .field("id", &self.id)
            .field("name", &self.config().name)
            .field("tools", &self.executor.tools())
            .finish_non_exhaustive()
    }
}

impl ChatAgent {
    /// Start building an agent with the given display name
    pub fn builder(name: impl Into<String>) -> ChatAgentBuilder {
        ChatAgentBuilder::new(name)
    }

    /// Configuration the agent was built with
    pub fn config(&self) -> &AgentConfig {
        self.executor.config()
    }

    /// Tools bound to this agent
    pub fn tools(&self) -> &ToolRegistry {
        self.executor.tools()
    }

    fn wrap(&self, err: Error) -> Error {
        Error::agent_execution(&self.config().name, err)
    }

    fn prepare(&self, thread: Option<&mut ConversationThread>) -> Result<Vec<Message>> {
        match thread {
            Some(thread) => {
                thread.claim(&self.id)?;
                Ok(from_thread(thread.history()))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Build the result and commit the turn to the thread
    ///
    /// Only called once the loop has finished, so a failed or abandoned run
    /// never touches the thread.
    fn finish(
        &self,
        input: String,
        outcome: ExecutionOutcome,
        thread: Option<&mut ConversationThread>,
    ) -> AgentResult {
        if let Some(thread) = thread {
            thread.commit([
                ThreadMessage::user(input),
                ThreadMessage::assistant(outcome.text.clone()),
            ]);
            debug!(agent = %self.config().name, thread_len = thread.len(), "Committed turn to thread");
        }

        info!(
            agent = %self.config().name,
            iterations = outcome.iterations,
            response_length = outcome.text.len(),
            "Agent turn completed"
        );

        AgentResult {
            agent_id: self.id.clone(),
            messages: exchange_to_thread(&outcome.exchange),
            text: outcome.text,
        }
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.config().name
    }

    fn description(&self) -> &str {
        &self.config().description
    }

    async fn run(
        &self,
        input: String,
        mut thread: Option<&mut ConversationThread>,
        ctx: &RunContext,
    ) -> Result<AgentResult> {
        let history = self
            .prepare(thread.as_deref_mut())
            .map_err(|e| self.wrap(e))?;

        let outcome = self
            .executor
            .run(history, input.clone(), ctx)
            .await
            .map_err(|e| self.wrap(e))?;

        Ok(self.finish(input, outcome, thread))
    }

    fn run_streaming<'a>(
        &'a self,
        input: String,
        thread: Option<&'a mut ConversationThread>,
        ctx: &'a RunContext,
    ) -> SegmentStream<'a> {
        Box::pin(try_stream! {
            let mut thread = thread;
            let history = self
                .prepare(thread.as_deref_mut())
                .map_err(|e| self.wrap(e))?;

            let mut events = self
                .executor
                .execute(history, input.clone(), ctx, ResponseMode::Streaming);

            while let Some(event) = events.next().await {
                match event.map_err(|e| self.wrap(e))? {
                    ExecutorEvent::TextDelta(text) => {
                        yield StreamSegment::fragment(&self.id, &self.config().name, text);
                    }
                    ExecutorEvent::Completed(outcome) => {
                        self.finish(input.clone(), outcome, thread.as_deref_mut());
                        yield StreamSegment::finished(&self.id, &self.config().name);
                    }
                    ExecutorEvent::ToolStarted { .. } | ExecutorEvent::ToolFinished { .. } => {}
                }
            }
        })
    }
}

/// Builder for [`ChatAgent`]
pub struct ChatAgentBuilder {
    config: AgentConfig,
    provider: Option<Arc<dyn LLMProvider>>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ChatAgentBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: AgentConfig {
                name: name.into(),
                ..AgentConfig::default()
            },
            provider: None,
            tools: Vec::new(),
        }
    }

    /// Replace the whole configuration, keeping the name if the new one has none
    pub fn config(mut self, config: AgentConfig) -> Self {
        let name = std::mem::take(&mut self.config.name);
        self.config = config;
        if self.config.name.is_empty() {
            self.config.name = name;
        }
        self
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the system instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = instructions.into();
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the tool loop cap
    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.config.max_tool_iterations = max;
        self
    }

    /// Bind a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Bind several tools
    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Build the agent
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if the provider is missing or the
    ///   configuration is invalid
    /// - [`Error::DuplicateToolName`] if two bound tools share a name
    pub fn build(self) -> Result<ChatAgent> {
        self.config.validate()?;
        let provider = self.provider.ok_or_else(|| {
            Error::Configuration(format!("agent '{}' has no provider", self.config.name))
        })?;
        let registry = ToolRegistry::from_tools(self.tools)?;

        let agent = ChatAgent {
            id: uuid::Uuid::new_v4().to_string(),
            executor: AgentExecutor::new(provider, Arc::new(registry), self.config),
        };
        debug!(agent = %agent.config().name, id = %agent.id, tools = ?agent.tools().names(), "Built agent");
        Ok(agent)
    }
}
