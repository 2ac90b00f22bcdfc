//! Tool descriptions offered to a model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable capability as the model sees it
///
/// Providers translate this into their wire format (OpenAI wraps it as a
/// `function` tool). The schema is a JSON Schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the model uses to call the tool
    pub name: String,

    /// When to use the tool
    pub description: String,

    /// JSON Schema of the arguments object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_serializes_schema_verbatim() {
        let schema = json!({
            "type": "object",
            "properties": { "symbol": { "type": "string" } },
            "required": ["symbol"],
        });

        let tool = ToolDefinition::new("stock_price", "Latest price of a stock", schema.clone());
        let wire = serde_json::to_value(&tool).unwrap();

        assert_eq!(wire["name"], "stock_price");
        assert_eq!(wire["input_schema"], schema);
    }
}
