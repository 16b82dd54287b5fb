//! Append-only audit log
//!
//! Every decision is recorded before its action runs, so a crash mid-action
//! still leaves a trail of what was intended. Outcomes attach to the most
//! recent entry for their step once the action resolves. Persistence is
//! best-effort JSONL: decisions append a line, outcome updates rewrite the
//! whole file in original append order.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionKind};
use crate::state::{AgentState, OutcomeKind, PolicyContext};
use crate::JsonMap;

/// State snapshot captured at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub goal: String,
    pub history_length: usize,
    pub policy_context: PolicyContext,
}

/// The decision as recorded: type tag, rationale, type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_type: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitl_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
}

impl From<&Decision> for DecisionRecord {
    fn from(decision: &Decision) -> Self {
        let mut record = Self {
            decision_type: decision.kind_name().to_string(),
            rationale: decision.rationale.clone(),
            selected_tool: None,
            arguments: None,
            hitl_request: None,
            final_response: None,
        };
        match &decision.kind {
            DecisionKind::Tool { name, arguments } => {
                record.selected_tool = Some(name.clone());
                record.arguments = Some(arguments.clone());
            }
            DecisionKind::Hitl { request } => {
                record.hitl_request = Some(request.clone());
            }
            DecisionKind::Final { response } => {
                record.final_response = Some(response.clone());
            }
        }
        record
    }
}

/// Outcome of the action a decision led to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// "tool" or "hitl"
    pub kind: String,
    pub status: OutcomeKind,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonMap>,
}

/// One persisted audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    pub input_snapshot: InputSnapshot,
    pub decision_output: DecisionRecord,
    /// Null until the action resolves
    #[serde(default)]
    pub outcome: Option<OutcomeRecord>,
}

/// Full session for programmatic replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub session_id: String,
    pub entries: Vec<AuditEntry>,
}

/// The audit log for one run.
///
/// Entries are never deleted or reordered; step numbers may repeat and the
/// most recent entry for a step receives its outcome.
#[derive(Debug)]
pub struct AuditLog {
    session_id: String,
    entries: Vec<AuditEntry>,
    destination: Option<PathBuf>,
}

impl AuditLog {
    /// Create a log, persisting to `destination` when given.
    ///
    /// Persistence is best-effort: the in-memory log is authoritative and a
    /// failed write only warns.
    pub fn new(destination: Option<PathBuf>) -> Self {
        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        if let Some(dir) = &destination {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), error = %e, "Failed to create audit directory");
            }
        }
        Self {
            session_id,
            entries: Vec::new(),
            destination,
        }
    }

    /// Create a purely in-memory log.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Path of the JSONL file, when persistence is configured.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.destination
            .as_ref()
            .map(|dir| dir.join(format!("session_{}.jsonl", self.session_id)))
    }

    /// Record a decision with `outcome = null`. Always succeeds; the entry
    /// is returned for callers that want the assigned timestamp.
    pub fn log_decision(
        &mut self,
        step: usize,
        state: &AgentState,
        ctx: &PolicyContext,
        decision: &Decision,
    ) -> &AuditEntry {
        let entry = AuditEntry {
            step,
            timestamp: Utc::now(),
            input_snapshot: InputSnapshot {
                goal: state.goal().to_string(),
                history_length: state.history().len(),
                policy_context: ctx.clone(),
            },
            decision_output: DecisionRecord::from(decision),
            outcome: None,
        };

        self.append_line(&entry);
        self.entries.push(entry);
        debug!(step, entries = self.entries.len(), "Logged decision");
        self.entries.last().expect("entry just appended")
    }

    /// Attach an outcome to the most recent entry for `step`.
    ///
    /// Searched from the end so repeated steps (a HITL question/answer pair)
    /// attach to the latest matching entry. On success the whole file is
    /// rewritten, since the outcome mutates an already-written line.
    pub fn log_outcome(
        &mut self,
        step: usize,
        kind: &str,
        status: OutcomeKind,
        result: &str,
        data: Option<JsonMap>,
    ) {
        let Some(index) = self.entries.iter().rposition(|e| e.step == step) else {
            warn!(step, "No audit entry found for outcome");
            return;
        };

        self.entries[index].outcome = Some(OutcomeRecord {
            kind: kind.to_string(),
            status,
            result: result.to_string(),
            data,
        });
        self.rewrite_all();
        debug!(step, kind, "Logged outcome");
    }

    /// Export the whole session for programmatic replay.
    pub fn export_session(&self) -> SessionExport {
        SessionExport {
            session_id: self.session_id.clone(),
            entries: self.entries.clone(),
        }
    }

    /// Rebuild a log from an exported session, in-memory only.
    pub fn from_export(export: SessionExport) -> Self {
        Self {
            session_id: export.session_id,
            entries: export.entries,
            destination: None,
        }
    }

    /// Load a persisted session file, entry by entry, preserving step order
    /// and outcome attachment exactly as logged.
    pub fn load_session(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;

        let session_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_start_matches("session_").to_string())
            .unwrap_or_default();

        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", lineno + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse audit entry on line {}", lineno + 1))?;
            entries.push(entry);
        }

        Ok(Self {
            session_id,
            entries,
            destination: path.parent().map(|p| p.to_path_buf()),
        })
    }

    fn append_line(&self, entry: &AuditEntry) {
        let Some(path) = self.log_path() else {
            return;
        };
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };
        let write = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{}", line));
        if let Err(e) = write {
            warn!(path = %path.display(), error = %e, "Failed to append audit entry");
        }
    }

    fn rewrite_all(&self) {
        let Some(path) = self.log_path() else {
            return;
        };
        let mut buf = String::new();
        for entry in &self.entries {
            match serde_json::to_string(entry) {
                Ok(line) => {
                    buf.push_str(&line);
                    buf.push('\n');
                }
                Err(e) => {
                    warn!(error = %e, "Failed to serialize audit entry");
                    return;
                }
            }
        }
        if let Err(e) = fs::write(&path, buf) {
            warn!(path = %path.display(), error = %e, "Failed to rewrite audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, RawDecision};

    fn tool_decision() -> Decision {
        Decision::from_raw(RawDecision {
            rationale: "use the calculator".to_string(),
            decision_type: "tool".to_string(),
            selected_tool: "calculate".to_string(),
            arguments: r#"{"expression": "2+2"}"#.to_string(),
            ..Default::default()
        })
    }

    fn hitl_decision() -> Decision {
        Decision::from_raw(RawDecision {
            rationale: "need the city".to_string(),
            decision_type: "hitl".to_string(),
            hitl_request: "which city?".to_string(),
            ..Default::default()
        })
    }

    fn state() -> AgentState {
        AgentState::new("test goal", vec!["hello".to_string()])
    }

    #[test]
    fn test_log_decision_appends_with_null_outcome() {
        let mut log = AuditLog::in_memory();
        log.log_decision(0, &state(), &PolicyContext::default(), &tool_decision());

        assert_eq!(log.entries().len(), 1);
        let entry = &log.entries()[0];
        assert_eq!(entry.step, 0);
        assert_eq!(entry.decision_output.decision_type, "tool");
        assert_eq!(
            entry.decision_output.selected_tool.as_deref(),
            Some("calculate")
        );
        assert!(entry.outcome.is_none());
    }

    #[test]
    fn test_log_outcome_attaches_to_step() {
        let mut log = AuditLog::in_memory();
        log.log_decision(0, &state(), &PolicyContext::default(), &tool_decision());
        log.log_outcome(0, "tool", OutcomeKind::Success, "Result: 4", None);

        let outcome = log.entries()[0].outcome.as_ref().unwrap();
        assert_eq!(outcome.kind, "tool");
        assert_eq!(outcome.status, OutcomeKind::Success);
        assert_eq!(outcome.result, "Result: 4");
    }

    #[test]
    fn test_log_outcome_attaches_to_latest_matching_step() {
        let mut log = AuditLog::in_memory();
        let ctx = PolicyContext::default();
        // Two entries share step 2, as a HITL question/answer pair does.
        log.log_decision(2, &state(), &ctx, &hitl_decision());
        log.log_decision(2, &state(), &ctx, &hitl_decision());

        log.log_outcome(2, "hitl", OutcomeKind::Feedback, "Tokyo", None);
        assert!(log.entries()[0].outcome.is_none());
        assert!(log.entries()[1].outcome.is_some());
    }

    #[test]
    fn test_log_outcome_for_unknown_step_is_ignored() {
        let mut log = AuditLog::in_memory();
        log.log_decision(0, &state(), &PolicyContext::default(), &tool_decision());
        log.log_outcome(7, "tool", OutcomeKind::Success, "nothing", None);
        assert!(log.entries()[0].outcome.is_none());
    }

    #[test]
    fn test_export_round_trips_through_from_export() {
        let mut log = AuditLog::in_memory();
        let ctx = PolicyContext::default();
        log.log_decision(0, &state(), &ctx, &tool_decision());
        log.log_outcome(0, "tool", OutcomeKind::Success, "Result: 4", None);
        log.log_decision(1, &state(), &ctx, &hitl_decision());

        let replayed = AuditLog::from_export(log.export_session());
        assert_eq!(replayed.session_id(), log.session_id());
        assert_eq!(replayed.entries(), log.entries());
    }

    #[test]
    fn test_persistence_and_load_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = AuditLog::new(Some(dir.path().to_path_buf()));
        let ctx = PolicyContext::default();

        log.log_decision(0, &state(), &ctx, &tool_decision());
        log.log_outcome(0, "tool", OutcomeKind::Error, "boom", None);
        log.log_decision(1, &state(), &ctx, &hitl_decision());

        let path = log.log_path().unwrap();
        assert!(path.is_file());

        let loaded = AuditLog::load_session(&path).unwrap();
        assert_eq!(loaded.session_id(), log.session_id());
        assert_eq!(loaded.entries(), log.entries());
    }

    #[test]
    fn test_outcome_update_rewrites_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = AuditLog::new(Some(dir.path().to_path_buf()));
        let ctx = PolicyContext::default();

        for step in 0..3 {
            log.log_decision(step, &state(), &ctx, &tool_decision());
        }
        // Update the middle entry; line order must stay by original append.
        log.log_outcome(1, "tool", OutcomeKind::Success, "ok", None);

        let content = fs::read_to_string(log.log_path().unwrap()).unwrap();
        let steps: Vec<usize> = content
            .lines()
            .map(|l| serde_json::from_str::<AuditEntry>(l).unwrap().step)
            .collect();
        assert_eq!(steps, vec![0, 1, 2]);
    }

    #[test]
    fn test_in_memory_log_has_no_path() {
        let log = AuditLog::in_memory();
        assert!(log.log_path().is_none());
    }
}
