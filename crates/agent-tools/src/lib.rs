//! Tool framework for LLM agents
//!
//! This crate provides a framework for defining and executing tools (functions)
//! that agents can offer to a model: a [`Tool`] trait, declared
//! [`ParameterSchema`]s that arguments are checked against, closure-backed
//! [`FunctionTool`]s and the per-agent [`ToolRegistry`].

pub mod registry;
pub mod schema;
pub mod tool;

pub use registry::ToolRegistry;
pub use schema::{ParamSpec, ParamType, ParameterSchema};
pub use tool::{FunctionTool, Tool};
