//! Tool for reading the current time

use agent_core::Result;
use agent_tools::{ParameterSchema, Tool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::CURRENT_UTC_TIME;

/// Format a UTC instant as RFC 1123, e.g. `Tue, 14 Oct 2025 09:30:00 GMT`
pub fn format_rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Returns the current time in UTC
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    async fn execute(&self, _params: Value) -> Result<Value> {
        Ok(json!(format_rfc1123(Utc::now())))
    }

    fn name(&self) -> &str {
        CURRENT_UTC_TIME
    }

    fn description(&self) -> &str {
        "Retrieves the current time in UTC."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }
}
