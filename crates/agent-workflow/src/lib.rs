//! Multi-agent orchestration: sequential workflows exposed as agents
//!
//! A [`SequentialWorkflow`] runs its stages one after another, handing the
//! full output of each stage to the next through a [`HandoffTemplate`]. The
//! built [`WorkflowAgent`] implements the same `Agent` contract as a leaf
//! agent, so workflows nest. [`WorkflowSession`] adds per-stage memory and
//! [`StreamRelay`] delivers a streamed run to a single consumer.

pub mod handoff;
pub mod relay;
pub mod session;
pub mod workflow;
pub mod workflow_agent;

// Re-export for convenience
pub use handoff::{DEFAULT_HANDOFF_TEMPLATE, HandoffTemplate};
pub use relay::{RelayedSegment, StreamRelay};
pub use session::WorkflowSession;
pub use workflow::{SequentialWorkflow, WorkflowBuilder, WorkflowStep};
pub use workflow_agent::WorkflowAgent;
