//! Workflow definition

use crate::{HandoffTemplate, WorkflowAgent};
use agent_core::{Agent, Error, Result};
use std::sync::Arc;

/// A stage of a workflow
///
/// Both variants satisfy the [`Agent`] contract, so a stage is either a
/// leaf agent or a whole nested workflow.
#[derive(Clone)]
pub enum WorkflowStep {
    /// A single agent
    Agent(Arc<dyn Agent>),
    /// A nested workflow
    Workflow(Arc<WorkflowAgent>),
}

impl WorkflowStep {
    /// The stage viewed through the common agent contract
    pub fn agent(&self) -> &dyn Agent {
        match self {
            WorkflowStep::Agent(agent) => agent.as_ref(),
            WorkflowStep::Workflow(workflow) => workflow.as_ref(),
        }
    }

    /// Display name of the stage
    pub fn name(&self) -> &str {
        self.agent().name()
    }

    /// Whether this stage is a nested workflow
    pub fn is_workflow(&self) -> bool {
        matches!(self, WorkflowStep::Workflow(_))
    }
}

impl std::fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStep::Agent(agent) => f.debug_tuple("Agent").field(&agent.name()).finish(),
            WorkflowStep::Workflow(workflow) => f.debug_tuple("Workflow").field(workflow).finish(),
        }
    }
}

impl From<Arc<dyn Agent>> for WorkflowStep {
    fn from(agent: Arc<dyn Agent>) -> Self {
        WorkflowStep::Agent(agent)
    }
}

impl From<Arc<WorkflowAgent>> for WorkflowStep {
    fn from(workflow: Arc<WorkflowAgent>) -> Self {
        WorkflowStep::Workflow(workflow)
    }
}

/// Sequential composition of agents
///
/// Stages run strictly one after another. Every stage after the first gets
/// an input composed by the [`HandoffTemplate`] from the original request
/// and the complete output of the previous stage. Building a workflow yields
/// a [`WorkflowAgent`], which is itself an agent.
///
/// # Example
///
/// ```no_run
/// use agent_workflow::SequentialWorkflow;
/// use agent_core::{Agent, RunContext};
/// use std::sync::Arc;
///
/// # async fn example(research: Arc<dyn Agent>, risk: Arc<dyn Agent>) -> agent_core::Result<()> {
/// let workflow = SequentialWorkflow::builder("PortfolioWorkflow")
///     .add_agent(research)
///     .add_agent(risk)
///     .build()?;
///
/// let result = workflow.run("MSFT 60%, AAPL 40%".to_string(), None, &RunContext::new()).await?;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
pub struct SequentialWorkflow;

impl SequentialWorkflow {
    /// Create a new workflow builder
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }
}

/// Builder for constructing workflows
pub struct WorkflowBuilder {
    name: String,
    description: String,
    steps: Vec<WorkflowStep>,
    handoff: HandoffTemplate,
}

impl WorkflowBuilder {
    /// Create a new workflow builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            handoff: HandoffTemplate::default(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an agent stage
    pub fn add_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.steps.push(WorkflowStep::Agent(agent));
        self
    }

    /// Add a nested workflow stage
    pub fn add_workflow(mut self, workflow: Arc<WorkflowAgent>) -> Self {
        self.steps.push(WorkflowStep::Workflow(workflow));
        self
    }

    /// Add a stage of either kind
    pub fn add_step(mut self, step: impl Into<WorkflowStep>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Replace the handoff template
    pub fn handoff(mut self, template: HandoffTemplate) -> Self {
        self.handoff = template;
        self
    }

    /// Build the workflow
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyWorkflow`] if no stage was added
    /// - [`Error::Configuration`] if the name is empty
    pub fn build(self) -> Result<WorkflowAgent> {
        if self.steps.is_empty() {
            return Err(Error::EmptyWorkflow);
        }
        if self.name.trim().is_empty() {
            return Err(Error::Configuration(
                "workflow name must not be empty".to_string(),
            ));
        }

        Ok(WorkflowAgent::new(
            self.name,
            self.description,
            self.steps,
            self.handoff,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_workflow_is_rejected() {
        let result = SequentialWorkflow::builder("Empty").build();
        assert!(matches!(result, Err(Error::EmptyWorkflow)));
    }
}
