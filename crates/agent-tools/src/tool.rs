//! Tool trait definition

use crate::ParameterSchema;
use agent_core::{Error, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Trait for tools that agents can execute
///
/// Tools are functions that LLM agents can call to interact with the world.
/// Each tool must provide a name, description, and its declared parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    ///
    /// # Arguments
    ///
    /// * `params` - Tool input as JSON value, already validated against
    ///   [`Tool::parameters`] when called through a `ToolRegistry`
    ///
    /// # Returns
    ///
    /// Tool output as JSON value
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry
    fn name(&self) -> &str;

    /// Get the tool's description
    ///
    /// This description helps the LLM understand when to use this tool
    fn description(&self) -> &str;

    /// Declared parameters
    fn parameters(&self) -> ParameterSchema;

    /// Get the tool's input schema (JSON Schema format)
    fn input_schema(&self) -> Value {
        self.parameters().to_json_schema()
    }
}

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A tool backed by an async closure
///
/// # Example
///
/// ```
/// use agent_tools::{FunctionTool, ParameterSchema, Tool};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let tool = FunctionTool::new(
///     "get_time",
///     "Current time",
///     ParameterSchema::new(),
///     |_args| async { Ok(json!("noon")) },
/// );
///
/// assert_eq!(tool.execute(json!({})).await.unwrap(), json!("noon"));
/// # });
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ParameterSchema,
    handler: Handler,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    /// Wrap an async function taking raw JSON arguments
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| -> BoxFuture<'static, Result<Value>> {
                Box::pin(handler(args))
            }),
        }
    }

    /// Wrap an async function with typed arguments and output
    ///
    /// Arguments are deserialized into `A` (a failure is reported as a schema
    /// mismatch) and the output is serialized back to JSON.
    pub fn typed<A, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let name = name.into();
        let tool_name = name.clone();
        let handler = Arc::new(handler);
        Self::new(name, description, parameters, move |args: Value| {
            let tool_name = tool_name.clone();
            let handler = Arc::clone(&handler);
            async move {
                let args = if args.is_null() {
                    Value::Object(serde_json::Map::new())
                } else {
                    args
                };
                let typed: A = serde_json::from_value(args).map_err(|e| Error::SchemaMismatch {
                    tool: tool_name.clone(),
                    reason: e.to_string(),
                })?;
                let output = (*handler)(typed).await?;
                serde_json::to_value(output).map_err(|e| Error::ToolInvocation {
                    tool: tool_name,
                    reason: format!("output is not serializable: {e}"),
                })
            }
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        (self.handler)(params).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> ParameterSchema {
        self.parameters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamType;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    fn add_tool() -> FunctionTool {
        FunctionTool::typed(
            "add",
            "Add two integers",
            ParameterSchema::new()
                .required("a", ParamType::Integer, "left")
                .required("b", ParamType::Integer, "right"),
            |args: AddArgs| async move { Ok(args.a + args.b) },
        )
    }

    #[tokio::test]
    async fn test_typed_tool_round_trip() {
        let tool = add_tool();
        assert_eq!(tool.name(), "add");
        assert_eq!(tool.input_schema()["required"], json!(["a", "b"]));
        assert_eq!(tool.execute(json!({"a": 2, "b": 3})).await.unwrap(), json!(5));
    }

    #[tokio::test]
    async fn test_typed_tool_bad_args() {
        let err = add_tool().execute(json!({"a": "two"})).await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }
}
