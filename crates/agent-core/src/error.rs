//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
///
/// Tool-level failures (`SchemaMismatch`, `ToolInvocation`) are normally fed
/// back to the model as tool results and never reach the caller. Everything
/// else ends the current turn and is surfaced as-is, nested cause included.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid agent setup, raised at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Two tools with the same name were bound to one agent
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// The model asked for a tool the agent does not have
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments do not match the declared parameter schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    SchemaMismatch {
        /// Tool name
        tool: String,
        /// What did not match
        reason: String,
    },

    /// The wrapped tool implementation failed
    #[error("Tool '{tool}' failed: {reason}")]
    ToolInvocation {
        /// Tool name
        tool: String,
        /// Failure description
        reason: String,
    },

    /// The model kept requesting tools past the iteration cap
    #[error("Tool loop exceeded {max_iterations} iterations without a final answer")]
    ToolLoopExceeded {
        /// Configured cap
        max_iterations: usize,
    },

    /// The model endpoint failed or was unreachable
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A thread was handed to an agent that does not own it
    #[error("Thread {thread_id} belongs to agent {owner}, not {agent}")]
    ThreadOwnership {
        /// Thread identifier
        thread_id: String,
        /// Agent that owns the thread
        owner: String,
        /// Agent that tried to use it
        agent: String,
    },

    /// An agent turn failed; wraps the underlying cause
    ///
    /// The cause is rendered in the message and is not reported by
    /// `std::error::Error::source`.
    #[error("Agent '{agent}' failed: {cause}")]
    AgentExecution {
        /// Display name of the failing agent
        agent: String,
        /// Underlying cause
        cause: Box<Error>,
    },

    /// A workflow stage failed; the whole workflow run is aborted
    #[error("Workflow stage {stage_index} ({stage}) failed: {cause}")]
    WorkflowStageFailed {
        /// Zero-based position of the stage
        stage_index: usize,
        /// Display name of the stage
        stage: String,
        /// Underlying cause
        cause: Box<Error>,
    },

    /// A workflow was built without stages
    #[error("Workflow must contain at least one stage")]
    EmptyWorkflow,

    /// The caller cancelled the run
    #[error("Run cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap an error as the failure of the named agent
    ///
    /// Cancellation is passed through untouched so callers can still tell a
    /// cancelled run from a failed one.
    pub fn agent_execution(agent: impl Into<String>, source: Error) -> Self {
        match source {
            Error::Cancelled => Error::Cancelled,
            other => Error::AgentExecution {
                agent: agent.into(),
                cause: Box::new(other),
            },
        }
    }

    /// Whether this error (or anything it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::AgentExecution { cause, .. } | Error::WorkflowStageFailed { cause, .. } => {
                cause.is_cancelled()
            }
            _ => false,
        }
    }

    /// The innermost error of a wrapped chain
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::AgentExecution { cause, .. } | Error::WorkflowStageFailed { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_display_keeps_cause() {
        let err = Error::WorkflowStageFailed {
            stage_index: 1,
            stage: "RiskAssessmentAgent".to_string(),
            cause: Box::new(Error::agent_execution(
                "RiskAssessmentAgent",
                Error::ModelUnavailable("HTTP 503".to_string()),
            )),
        };

        let text = err.to_string();
        assert!(text.contains("stage 1"));
        assert!(text.contains("RiskAssessmentAgent"));
        assert!(text.contains("HTTP 503"));
        assert!(matches!(err.root_cause(), Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_chain_prints_cause_once() {
        let err = Error::WorkflowStageFailed {
            stage_index: 0,
            stage: "PortfolioResearchAgent".to_string(),
            cause: Box::new(Error::agent_execution(
                "PortfolioResearchAgent",
                Error::ModelUnavailable("HTTP 503".to_string()),
            )),
        };

        assert!(std::error::Error::source(&err).is_none());
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain.matches("HTTP 503").count(), 1);
    }

    #[test]
    fn test_cancellation_passes_through_agent_wrapper() {
        let err = Error::agent_execution("a", Error::Cancelled);
        assert!(matches!(err, Error::Cancelled));
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_is_cancelled_through_stage_wrapper() {
        let err = Error::WorkflowStageFailed {
            stage_index: 0,
            stage: "s".to_string(),
            cause: Box::new(Error::Cancelled),
        };
        assert!(err.is_cancelled());
        assert!(!Error::EmptyWorkflow.is_cancelled());
    }
}
