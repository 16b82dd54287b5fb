//! Decision oracle boundary and validation
//!
//! The oracle produces intent, not effects. Whatever shape the external
//! policy service returns is validated here into a `Decision` with exactly
//! one populated variant; a malformed-but-recoverable response never aborts
//! the run.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::state::{AgentState, HistoryEntry, PolicyContext};
use crate::JsonMap;

/// Immutable snapshot handed to the oracle for one decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest {
    pub goal: String,
    pub user_messages: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub org_policies: String,
    pub industry_rules: String,
    pub domain_guidelines: String,
    /// Rendered tool catalog - the only channel by which the oracle learns
    /// what tools exist and their argument shapes.
    pub available_tools: String,
}

impl DecisionRequest {
    pub fn snapshot(state: &AgentState, ctx: &PolicyContext, available_tools: String) -> Self {
        Self {
            goal: state.goal().to_string(),
            user_messages: state.user_messages().to_vec(),
            history: state.history().to_vec(),
            org_policies: ctx.org_policies.clone(),
            industry_rules: ctx.industry_rules.clone(),
            domain_guidelines: ctx.domain_guidelines.clone(),
            available_tools,
        }
    }
}

/// Raw decision shape as returned by the oracle transport.
///
/// Every field is defaulted and unknown extra fields are ignored, so any
/// response the transport manages to deliver deserializes into this.
/// `arguments` is a JSON-encoded string, parsed during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDecision {
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub decision_type: String,
    #[serde(default)]
    pub selected_tool: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub hitl_request: String,
    #[serde(default)]
    pub final_response: String,
}

/// External decision oracle.
///
/// Transport failures (network, auth) propagate as `Err` to the run caller;
/// the core does not own retry policy for the oracle.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<RawDecision>;
}

/// A validated decision: exactly one variant, shared rationale.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub rationale: String,
    pub kind: DecisionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionKind {
    /// Execute a registered tool with the given argument map.
    Tool { name: String, arguments: JsonMap },
    /// Ask a human for input.
    Hitl { request: String },
    /// Terminate the run with a final answer.
    Final { response: String },
}

impl Decision {
    /// Validate a raw oracle response.
    ///
    /// The declared type is trimmed and lowercased before matching; anything
    /// other than the three known values is coerced to `Final` with a
    /// diagnostic response so the type is never ambiguous. Fields irrelevant
    /// to the resolved variant are dropped.
    pub fn from_raw(raw: RawDecision) -> Self {
        let kind = match raw.decision_type.trim().to_lowercase().as_str() {
            "tool" => DecisionKind::Tool {
                name: raw.selected_tool,
                arguments: parse_arguments(&raw.arguments),
            },
            "hitl" => DecisionKind::Hitl {
                request: raw.hitl_request,
            },
            "final" => DecisionKind::Final {
                response: raw.final_response,
            },
            other => {
                debug!(decision_type = %other, "Unrecognized decision type, coercing to final");
                let shown = if other.is_empty() { "<missing>" } else { other };
                DecisionKind::Final {
                    response: format!(
                        "Unrecognized decision type '{}'; ending the run without a final answer.",
                        shown
                    ),
                }
            }
        };

        Self {
            rationale: raw.rationale,
            kind,
        }
    }

    /// The lowercase tag of the resolved variant.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DecisionKind::Tool { .. } => "tool",
            DecisionKind::Hitl { .. } => "hitl",
            DecisionKind::Final { .. } => "final",
        }
    }
}

/// Parse the JSON-encoded arguments string from a tool decision.
///
/// A parse failure or a non-object value yields an empty map rather than an
/// error: a recoverable oracle slip must not abort the run.
fn parse_arguments(raw: &str) -> JsonMap {
    if raw.trim().is_empty() {
        return JsonMap::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            debug!(arguments = %raw, "Failed to parse tool arguments, using empty map");
            JsonMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_decision_parses_arguments() {
        let raw = RawDecision {
            rationale: "use the calculator".to_string(),
            decision_type: "tool".to_string(),
            selected_tool: "calculate".to_string(),
            arguments: r#"{"expression": "2+2*10"}"#.to_string(),
            ..Default::default()
        };

        let decision = Decision::from_raw(raw);
        assert_eq!(decision.kind_name(), "tool");
        match decision.kind {
            DecisionKind::Tool { name, arguments } => {
                assert_eq!(name, "calculate");
                assert_eq!(arguments.get("expression"), Some(&json!("2+2*10")));
            }
            other => panic!("expected tool decision, got {:?}", other),
        }
    }

    #[test]
    fn test_decision_type_is_case_and_whitespace_normalized() {
        let raw = RawDecision {
            decision_type: "  Final \n".to_string(),
            final_response: "done".to_string(),
            ..Default::default()
        };

        let decision = Decision::from_raw(raw);
        assert_eq!(
            decision.kind,
            DecisionKind::Final {
                response: "done".to_string()
            }
        );
    }

    #[test]
    fn test_unrecognized_type_coerces_to_final_with_diagnostic() {
        let raw = RawDecision {
            decision_type: "Tooo".to_string(),
            selected_tool: "calculate".to_string(),
            ..Default::default()
        };

        let decision = Decision::from_raw(raw);
        match decision.kind {
            DecisionKind::Final { response } => {
                assert!(!response.is_empty());
                assert!(response.contains("tooo"));
            }
            other => panic!("expected final decision, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_coerces_to_final() {
        let decision = Decision::from_raw(RawDecision::default());
        match decision.kind {
            DecisionKind::Final { response } => assert!(response.contains("<missing>")),
            other => panic!("expected final decision, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_arguments_yield_empty_map() {
        for bad in ["not json", "[1, 2, 3]", "\"just a string\"", "{broken"] {
            let raw = RawDecision {
                decision_type: "tool".to_string(),
                selected_tool: "calculate".to_string(),
                arguments: bad.to_string(),
                ..Default::default()
            };
            match Decision::from_raw(raw).kind {
                DecisionKind::Tool { arguments, .. } => {
                    assert!(arguments.is_empty(), "arguments for {:?} not empty", bad)
                }
                other => panic!("expected tool decision, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_irrelevant_fields_are_dropped() {
        let raw = RawDecision {
            decision_type: "hitl".to_string(),
            hitl_request: "which city?".to_string(),
            selected_tool: "calculate".to_string(),
            final_response: "leftover".to_string(),
            ..Default::default()
        };

        let decision = Decision::from_raw(raw);
        assert_eq!(
            decision.kind,
            DecisionKind::Hitl {
                request: "which city?".to_string()
            }
        );
    }

    #[test]
    fn test_raw_decision_tolerates_extra_and_missing_fields() {
        let raw: RawDecision = serde_json::from_value(json!({
            "decision_type": "final",
            "final_response": "done",
            "action_confirmation": "extra field from the wire",
        }))
        .unwrap();

        assert_eq!(raw.decision_type, "final");
        assert_eq!(raw.final_response, "done");
        assert!(raw.selected_tool.is_empty());
    }
}
