//! Agent state owned by the orchestrator
//!
//! History grows monotonically and records facts (actions taken, arguments,
//! outcomes) - never policies or instructions.

use serde::{Deserialize, Serialize};

use crate::JsonMap;

/// Who performed a recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Agent,
    Tool,
    Human,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Agent => write!(f, "agent"),
            Actor::Tool => write!(f, "tool"),
            Actor::Human => write!(f, "human"),
        }
    }
}

/// Result status of a recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Error,
    Feedback,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "success"),
            OutcomeKind::Error => write!(f, "error"),
            OutcomeKind::Feedback => write!(f, "feedback"),
        }
    }
}

/// A single immutable entry in the agent's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Step number in the agent loop
    pub step: usize,
    /// Who performed the action
    pub actor: Actor,
    /// The action taken (tool name, or "hitl_request"/"hitl_response")
    pub action: String,
    /// Arguments for the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<JsonMap>,
    /// Result status of the action
    pub outcome: OutcomeKind,
    /// Result message
    pub result: String,
}

/// Static policy context for decision making.
///
/// Precedence (org > industry > domain > goal) is advisory metadata consumed
/// only by the oracle; the core does not enforce it mechanically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyContext {
    /// Organization-level policies (highest priority)
    #[serde(default)]
    pub org_policies: String,
    /// Industry or regulatory rules
    #[serde(default)]
    pub industry_rules: String,
    /// Domain-specific guidelines
    #[serde(default)]
    pub domain_guidelines: String,
}

/// Agent state owned by one orchestrator run.
///
/// `goal` and `user_messages` are fixed at construction. `history` is
/// append-only and only the orchestrator (this crate) can extend it.
/// `final_response` is set exactly once, on the terminal transition.
#[derive(Debug, Clone, Serialize)]
pub struct AgentState {
    goal: String,
    user_messages: Vec<String>,
    history: Vec<HistoryEntry>,
    final_response: Option<String>,
}

impl AgentState {
    /// Create a fresh state for a run.
    pub fn new(goal: impl Into<String>, user_messages: Vec<String>) -> Self {
        Self {
            goal: goal.into(),
            user_messages,
            history: Vec::new(),
            final_response: None,
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn user_messages(&self) -> &[String] {
        &self.user_messages
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    /// Whether the loop has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.final_response.is_some()
    }

    pub(crate) fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub(crate) fn set_final_response(&mut self, response: String) {
        debug_assert!(
            self.final_response.is_none(),
            "final response set more than once"
        );
        self.final_response = Some(response);
    }

    /// The step the next decision should be made at.
    ///
    /// Tool entries are recorded at the already-incremented step, HITL
    /// entries at the step of the decision that asked; deriving the counter
    /// from the last entry lets a suspended run resume without drift.
    pub(crate) fn next_step(&self) -> usize {
        match self.history.last() {
            None => 0,
            Some(entry) => match entry.actor {
                Actor::Tool => entry.step,
                Actor::Human | Actor::Agent => entry.step + 1,
            },
        }
    }
}
