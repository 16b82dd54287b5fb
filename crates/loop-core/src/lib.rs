//! loop-core: Bounded decision-loop orchestration
//!
//! Provides:
//! - Explicit, replayable agent state (goal, messages, append-only history)
//! - Tool registry with error-normalized execution
//! - Human-in-the-loop channels (console, callback, queued)
//! - Append-only audit log with JSONL persistence and session replay
//! - The orchestrator state machine driving decide -> act -> record

pub mod audit;
pub mod decision;
pub mod events;
pub mod hitl;
pub mod orchestrator;
pub mod state;
pub mod stream;
pub mod tools;

/// JSON object map used for tool arguments and structured payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

pub use audit::{AuditEntry, AuditLog, DecisionRecord, InputSnapshot, OutcomeRecord, SessionExport};
pub use decision::{Decision, DecisionKind, DecisionRequest, Oracle, RawDecision};
pub use events::{EventSink, FinishReason, RunEvent};
pub use hitl::{CallbackChannel, ConsoleChannel, HitlChannel, HitlReply, QueuedChannel};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunStatus};
pub use state::{Actor, AgentState, HistoryEntry, OutcomeKind, PolicyContext};
pub use stream::{BufferedStream, NullStream, StreamHandler};
pub use tools::{
    registry::ToolRegistry, ParameterProperty, ParameterSchema, Tool, ToolResult, ToolStatus,
};
