//! Declared tool parameters
//!
//! A [`ParameterSchema`] is the ordered list of typed parameters a tool
//! accepts. It renders to the JSON Schema offered to the model and checks the
//! arguments the model sends back before the tool runs.

use agent_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON type of a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// JSON string
    String,
    /// Whole number
    Integer,
    /// Any JSON number
    Number,
    /// `true` / `false`
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl ParamType {
    /// Name used in JSON Schema
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Expected JSON type
    pub param_type: ParamType,
    /// Description shown to the model
    pub description: String,
    /// Whether the argument must be present
    pub required: bool,
}

/// Ordered set of typed parameters
///
/// # Example
///
/// ```
/// use agent_tools::{ParamType, ParameterSchema};
/// use serde_json::json;
///
/// let schema = ParameterSchema::new()
///     .required("symbol", ParamType::String, "Ticker symbol, e.g. MSFT")
///     .optional("max_results", ParamType::Integer, "Result limit");
///
/// assert!(schema.validate("stock_price", &json!({"symbol": "MSFT"})).is_ok());
/// assert!(schema.validate("stock_price", &json!({"symbol": 42})).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    /// A schema with no parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter
    pub fn required(
        self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.with_param(name.into(), param_type, description.into(), true)
    }

    /// Add an optional parameter
    pub fn optional(
        self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.with_param(name.into(), param_type, description.into(), false)
    }

    fn with_param(
        mut self,
        name: String,
        param_type: ParamType,
        description: String,
        required: bool,
    ) -> Self {
        let spec = ParamSpec {
            name,
            param_type,
            description,
            required,
        };
        // Redeclaring a name replaces the earlier entry in place
        match self.params.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.params.push(spec),
        }
        self
    }

    /// Declared parameters, in declaration order
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Whether the tool takes no arguments
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `args` against the declared parameters
    ///
    /// `null` is accepted as "no arguments". Missing required arguments,
    /// wrongly typed values and undeclared arguments are rejected with
    /// [`Error::SchemaMismatch`]. An explicit `null` for an optional
    /// parameter counts as absent.
    pub fn validate(&self, tool: &str, args: &Value) -> Result<()> {
        let mismatch = |reason: String| Error::SchemaMismatch {
            tool: tool.to_string(),
            reason,
        };

        let empty = Map::new();
        let object = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            Value::String(raw) => {
                return Err(mismatch(format!(
                    "arguments are not a valid JSON object: {raw}"
                )));
            }
            other => {
                return Err(mismatch(format!(
                    "arguments must be a JSON object, got {other}"
                )));
            }
        };

        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(mismatch(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.param_type.accepts(value) => {
                    return Err(mismatch(format!(
                        "argument '{}' must be of type {}",
                        param.name,
                        param.param_type.as_str()
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(mismatch(format!("unexpected argument '{unknown}'")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_for_date() -> ParameterSchema {
        ParameterSchema::new()
            .required("symbol", ParamType::String, "Ticker symbol")
            .required("date", ParamType::String, "Date as YYYY-MM-DD")
    }

    #[test]
    fn test_json_schema_keeps_order_and_required() {
        let schema = ParameterSchema::new()
            .required("query", ParamType::String, "Search query")
            .optional("max_results", ParamType::Integer, "Result limit")
            .to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["max_results"]["type"], "integer");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_validate_accepts_matching_args() {
        let schema = price_for_date();
        assert!(
            schema
                .validate("p", &json!({"symbol": "MSFT", "date": "2025-01-02"}))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let err = price_for_date()
            .validate("stock_price_for_date", &json!({"symbol": "MSFT"}))
            .unwrap_err();
        match err {
            Error::SchemaMismatch { tool, reason } => {
                assert_eq!(tool, "stock_price_for_date");
                assert!(reason.contains("date"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_wrong_type_and_unknown() {
        let schema = price_for_date();
        assert!(
            schema
                .validate("p", &json!({"symbol": 1, "date": "2025-01-02"}))
                .is_err()
        );
        assert!(
            schema
                .validate(
                    "p",
                    &json!({"symbol": "A", "date": "2025-01-02", "extra": true})
                )
                .is_err()
        );
        assert!(schema.validate("p", &json!(["MSFT"])).is_err());
    }

    #[test]
    fn test_validate_rejects_unparsed_arguments() {
        let err = price_for_date()
            .validate("stock_price_for_date", &json!(r#"{"symbol": "MSFT""#))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaMismatch { reason, .. } if reason.contains("not a valid JSON object")
        ));
    }

    #[test]
    fn test_validate_no_params() {
        let schema = ParameterSchema::new();
        assert!(schema.validate("current_utc_time", &Value::Null).is_ok());
        assert!(schema.validate("current_utc_time", &json!({})).is_ok());
    }

    #[test]
    fn test_integer_is_stricter_than_number() {
        let schema = ParameterSchema::new().optional("n", ParamType::Integer, "count");
        assert!(schema.validate("t", &json!({"n": 3})).is_ok());
        assert!(schema.validate("t", &json!({"n": 3.5})).is_err());
        assert!(schema.validate("t", &json!({"n": null})).is_ok());
    }
}
