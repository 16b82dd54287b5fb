//! Tool framework for the agent loop
//!
//! Tools are executed by the orchestrator, never by the oracle. All failures
//! are normalized into a `ToolResult` before they reach history.

pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::OutcomeKind;
use crate::JsonMap;

/// Whether a tool invocation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

impl From<ToolStatus> for OutcomeKind {
    fn from(status: ToolStatus) -> Self {
        match status {
            ToolStatus::Success => OutcomeKind::Success,
            ToolStatus::Error => OutcomeKind::Error,
        }
    }
}

/// Normalized result of a tool invocation.
///
/// Only `message` is meant for history and the oracle's textual context;
/// `data` is a structured payload that goes to the audit log alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    /// Human-readable result or error message, safe to place in history
    pub message: String,
    /// Structured data returned by the tool, never placed in history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonMap>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            data: None,
        }
    }

    /// Create a successful result with a structured payload.
    pub fn success_with_data(message: impl Into<String>, data: JsonMap) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

// A tool may hand back any plain value; it wraps as a success with the
// stringified value as the message.
impl From<String> for ToolResult {
    fn from(value: String) -> Self {
        ToolResult::success(value)
    }
}

impl From<&str> for ToolResult {
    fn from(value: &str) -> Self {
        ToolResult::success(value)
    }
}

impl From<Value> for ToolResult {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ToolResult::success(s),
            other => ToolResult::success(other.to_string()),
        }
    }
}

/// Schema for a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterProperty {
    /// Parameter type (string, number, boolean, array, object)
    #[serde(rename = "type")]
    pub param_type: String,
    /// Parameter description
    pub description: String,
}

impl ParameterProperty {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            param_type: "string".to_string(),
            description: description.into(),
        }
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self {
            param_type: "number".to_string(),
            description: description.into(),
        }
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self {
            param_type: "boolean".to_string(),
            description: description.into(),
        }
    }
}

/// Declared JSON shape of a tool's arguments.
///
/// Rendered into the tool catalog so the oracle knows what to send; argument
/// content is otherwise not validated by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: Vec<(String, ParameterProperty)>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, prop: ParameterProperty) -> Self {
        self.properties.push((name.into(), prop));
        self
    }

    pub fn with_required(mut self, name: impl Into<String>, prop: ParameterProperty) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.push((name, prop));
        self
    }

    /// One human-readable line per parameter, for the tool catalog.
    pub fn describe(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|(name, prop)| {
                let requirement = if self.required.contains(name) {
                    "required"
                } else {
                    "optional"
                };
                format!(
                    "{} ({}, {}): {}",
                    name, prop.param_type, requirement, prop.description
                )
            })
            .collect()
    }
}

/// The trait all tools implement.
///
/// `execute` receives the argument map straight from the decision; returning
/// `Err` is fine - the registry normalizes it into a `ToolResult::error`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Description shown to the oracle in the tool catalog
    fn description(&self) -> &str;

    /// Declared argument shape
    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    /// Execute the tool with the given arguments
    async fn execute(&self, args: &JsonMap) -> Result<ToolResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_wrap_as_success() {
        let from_str: ToolResult = "42".into();
        assert_eq!(from_str.status, ToolStatus::Success);
        assert_eq!(from_str.message, "42");

        let from_value: ToolResult = json!({"answer": 42}).into();
        assert_eq!(from_value.status, ToolStatus::Success);
        assert_eq!(from_value.message, r#"{"answer":42}"#);
        assert!(from_value.data.is_none());
    }

    #[test]
    fn test_tool_status_maps_to_outcome() {
        assert_eq!(OutcomeKind::from(ToolStatus::Success), OutcomeKind::Success);
        assert_eq!(OutcomeKind::from(ToolStatus::Error), OutcomeKind::Error);
    }

    #[test]
    fn test_schema_describe_marks_required() {
        let schema = ParameterSchema::new()
            .with_required("expression", ParameterProperty::string("What to evaluate"))
            .with_property("precision", ParameterProperty::number("Decimal places"));

        let lines = schema.describe();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "expression (string, required): What to evaluate"
        );
        assert_eq!(lines[1], "precision (number, optional): Decimal places");
    }
}
