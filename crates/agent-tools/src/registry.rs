//! Tool registry for managing available tools

use crate::{FunctionTool, ParameterSchema, Tool};
use agent_core::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Ordered set of uniquely named tools
///
/// A registry belongs to one agent. It is filled once while the agent is
/// built and is read-only afterwards, so it can be shared by every
/// concurrent run of that agent without locking. Tools are offered to the
/// model in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tools
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool
    ///
    /// Fails with [`Error::DuplicateToolName`] if a tool with the same name
    /// is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(Error::Configuration("tool name must not be empty".to_string()));
        }
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateToolName(name));
        }

        debug!(tool_name = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Wrap an async function as a tool and register it
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(Arc::new(FunctionTool::new(
            name,
            description,
            parameters,
            handler,
        )))
    }

    /// A registry holding only the named tools, in the order given
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let tools = names
            .iter()
            .map(|name| self.get(name).ok_or_else(|| Error::UnknownTool((*name).to_string())))
            .collect::<Result<Vec<_>>>()?;
        Self::from_tools(tools)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Validate `args` and invoke the named tool
    ///
    /// Errors:
    /// - [`Error::UnknownTool`] if no such tool is registered
    /// - [`Error::SchemaMismatch`] if `args` do not match the declared parameters
    /// - [`Error::ToolInvocation`] if the tool itself fails
    ///
    /// The call is made exactly once; the registry never retries.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        tool.parameters().validate(name, &args)?;

        let start = Instant::now();
        let outcome = tool.execute(args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                debug!(tool_name = %name, duration_ms, "Tool invocation succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(tool_name = %name, duration_ms, error = %err, "Tool invocation failed");
                Err(match err {
                    Error::SchemaMismatch { .. } | Error::ToolInvocation { .. } | Error::Cancelled => err,
                    other => Error::ToolInvocation {
                        tool: name.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// List all registered tools, in registration order
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    /// Names of all registered tools, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamType;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub QuoteTool {}

        #[async_trait]
        impl Tool for QuoteTool {
            async fn execute(&self, params: Value) -> Result<Value>;
            fn name(&self) -> &str;
            fn description(&self) -> &str;
            fn parameters(&self) -> ParameterSchema;
        }
    }

    fn symbol_schema() -> ParameterSchema {
        ParameterSchema::new().required("symbol", ParamType::String, "Ticker symbol")
    }

    fn mock_tool(name: &str) -> MockQuoteTool {
        let mut tool = MockQuoteTool::new();
        tool.expect_name().return_const(name.to_string());
        tool.expect_description().return_const("Quote lookup".to_string());
        tool.expect_parameters().returning(symbol_schema);
        tool
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(mock_tool("stock_price"))).unwrap();

        let err = registry
            .register(Arc::new(mock_tool("stock_price")))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateToolName(name) if name == "stock_price"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ToolRegistry::from_tools([
            Arc::new(mock_tool("web_search")) as Arc<dyn Tool>,
            Arc::new(mock_tool("stock_price")),
            Arc::new(mock_tool("current_utc_time")),
        ])
        .unwrap();

        assert_eq!(
            registry.names(),
            ["web_search", "stock_price", "current_utc_time"]
        );

        let subset = registry.select(&["current_utc_time", "web_search"]).unwrap();
        assert_eq!(subset.names(), ["current_utc_time", "web_search"]);
        assert!(matches!(
            registry.select(&["missing"]),
            Err(Error::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_validates_before_calling() {
        let mut tool = mock_tool("stock_price");
        tool.expect_execute()
            .times(1)
            .returning(|params| Ok(json!({ "symbol": params["symbol"], "price": 420.5 })));

        let registry = ToolRegistry::from_tools([Arc::new(tool) as Arc<dyn Tool>]).unwrap();

        let err = registry
            .invoke("stock_price", json!({ "ticker": "MSFT" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let out = registry
            .invoke("stock_price", json!({ "symbol": "MSFT" }))
            .await
            .unwrap();
        assert_eq!(out["price"], 420.5);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_invoke_wraps_tool_failures() {
        let mut tool = mock_tool("stock_price");
        tool.expect_execute()
            .times(1)
            .returning(|_| Err(Error::Configuration("quote service down".to_string())));
        let registry = ToolRegistry::from_tools([Arc::new(tool) as Arc<dyn Tool>]).unwrap();

        let err = registry
            .invoke("stock_price", json!({ "symbol": "MSFT" }))
            .await
            .unwrap_err();
        match err {
            Error::ToolInvocation { tool, reason } => {
                assert_eq!(tool, "stock_price");
                assert!(reason.contains("quote service down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_fn() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("get_time", "Current time", ParameterSchema::new(), |_| async {
                Ok(json!("12:00"))
            })
            .unwrap();

        assert!(registry.contains("get_time"));
        assert_eq!(registry.invoke("get_time", Value::Null).await.unwrap(), json!("12:00"));
    }
}
