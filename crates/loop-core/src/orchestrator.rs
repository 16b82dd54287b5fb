//! The agent loop orchestrator
//!
//! Owns the mutable state and drives the state machine: snapshot -> decide ->
//! log -> act -> record, until a final decision or the step bound. The oracle
//! produces intent; only the orchestrator produces effects.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::audit::AuditLog;
use crate::decision::{Decision, DecisionKind, DecisionRequest, Oracle};
use crate::events::{EventSink, FinishReason, RunEvent};
use crate::hitl::{ConsoleChannel, HitlChannel, HitlReply};
use crate::state::{Actor, AgentState, HistoryEntry, OutcomeKind, PolicyContext};
use crate::stream::{NullStream, StreamHandler};
use crate::tools::registry::ToolRegistry;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of step-advancing iterations before forced termination
    pub max_steps: usize,
    /// Directory for audit logs (in-memory only when unset)
    pub audit_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            audit_dir: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(dir.into());
        self
    }
}

/// How a `run` invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The oracle produced a final response.
    Finished,
    /// The step bound was reached; a fixed final response was set.
    Exhausted,
    /// A queued HITL request is pending. Provide the response on the channel
    /// and re-invoke `run` with the same state to continue.
    AwaitingHuman(String),
}

/// The agent loop orchestrator.
///
/// One orchestrator drives one state at a time; hosts wanting simultaneous
/// runs instantiate independent orchestrators, each with its own audit log
/// and step counter.
pub struct Orchestrator {
    oracle: Box<dyn Oracle>,
    tools: ToolRegistry,
    hitl: Arc<dyn HitlChannel>,
    stream: Arc<dyn StreamHandler>,
    sinks: Vec<Box<dyn EventSink>>,
    audit: AuditLog,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with default configuration (console HITL, no
    /// streaming, in-memory audit).
    pub fn new(oracle: impl Oracle + 'static, tools: ToolRegistry) -> Self {
        Self::with_config(oracle, tools, OrchestratorConfig::default())
    }

    pub fn with_config(
        oracle: impl Oracle + 'static,
        tools: ToolRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        let audit = AuditLog::new(config.audit_dir.clone());
        Self {
            oracle: Box::new(oracle),
            tools,
            hitl: Arc::new(ConsoleChannel),
            stream: Arc::new(NullStream),
            sinks: Vec::new(),
            audit,
            config,
        }
    }

    pub fn with_hitl(mut self, hitl: Arc<dyn HitlChannel>) -> Self {
        self.hitl = hitl;
        self
    }

    pub fn with_stream(mut self, stream: Arc<dyn StreamHandler>) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn emit(&self, event: RunEvent) {
        for sink in &self.sinks {
            sink.on_event(&event);
        }
    }

    /// Run the loop until a terminal decision, the step bound, or a pending
    /// queued HITL request.
    ///
    /// The only failure that escapes is the oracle transport itself failing;
    /// retry policy for that belongs to the caller. Tool failures and
    /// malformed decisions are folded into history and audit as values.
    #[instrument(skip_all, fields(max_steps = self.config.max_steps))]
    pub async fn run(
        &mut self,
        state: &mut AgentState,
        ctx: &PolicyContext,
    ) -> Result<RunStatus> {
        let mut step = state.next_step();
        info!(
            step,
            history = state.history().len(),
            "Starting agent loop"
        );
        self.emit(RunEvent::RunStarted {
            goal: state.goal().to_string(),
            user_messages: state.user_messages().len(),
            history_len: state.history().len(),
        });

        while step < self.config.max_steps {
            let request =
                DecisionRequest::snapshot(state, ctx, self.tools.tools_description());
            let raw = self.oracle.decide(&request).await?;
            let decision = Decision::from_raw(raw);

            // Logged before any action, so a crash mid-action still leaves a
            // trail of what was intended.
            self.audit.log_decision(step, state, ctx, &decision);
            debug!(step, decision = decision.kind_name(), "Decision made");
            self.emit(RunEvent::DecisionMade {
                step,
                decision: decision.clone(),
            });

            match decision.kind {
                DecisionKind::Final { response } => {
                    state.set_final_response(response.clone());
                    self.stream.on_complete(&response);
                    info!(step, "Agent produced final response");
                    self.emit(RunEvent::RunFinished {
                        reason: FinishReason::Final,
                        response,
                    });
                    return Ok(RunStatus::Finished);
                }

                DecisionKind::Hitl { request } => {
                    self.emit(RunEvent::HumanInputRequested {
                        step,
                        request: request.clone(),
                    });
                    match self.hitl.request_human_input(&request).await? {
                        HitlReply::Pending => {
                            // Nothing is recorded for an incomplete round;
                            // the resumed run re-decides and the channel
                            // answers from its queue.
                            info!(step, "Human input pending, suspending run");
                            return Ok(RunStatus::AwaitingHuman(request));
                        }
                        HitlReply::Answered(answer) => {
                            state.push_history(HistoryEntry {
                                step,
                                actor: Actor::Agent,
                                action: "hitl_request".to_string(),
                                arguments: None,
                                outcome: OutcomeKind::Success,
                                result: request,
                            });
                            state.push_history(HistoryEntry {
                                step,
                                actor: Actor::Human,
                                action: "hitl_response".to_string(),
                                arguments: None,
                                outcome: OutcomeKind::Feedback,
                                result: answer.clone(),
                            });
                            self.audit.log_outcome(
                                step,
                                "hitl",
                                OutcomeKind::Feedback,
                                &answer,
                                None,
                            );
                            self.emit(RunEvent::HumanInputReceived {
                                step,
                                response: answer,
                            });
                            // One increment per full question/answer round,
                            // so the oracle sees progress and does not re-ask.
                            step += 1;
                        }
                    }
                }

                DecisionKind::Tool { name, arguments } => {
                    let decision_step = step;
                    step += 1;
                    let result = self.tools.execute(&name, &arguments).await;
                    // Only the message becomes a history fact; the structured
                    // payload goes to the audit log alone.
                    state.push_history(HistoryEntry {
                        step,
                        actor: Actor::Tool,
                        action: name.clone(),
                        arguments: Some(arguments),
                        outcome: result.status.into(),
                        result: result.message.clone(),
                    });
                    self.audit.log_outcome(
                        decision_step,
                        "tool",
                        result.status.into(),
                        &result.message,
                        result.data.clone(),
                    );
                    self.emit(RunEvent::ToolExecuted {
                        step,
                        tool: name,
                        result,
                    });
                }
            }
        }

        // The only forced-termination path; the final response is always set.
        let response = format!(
            "Agent terminated after {} steps without reaching a final response.",
            self.config.max_steps
        );
        warn!(max_steps = self.config.max_steps, "Step bound reached");
        state.set_final_response(response.clone());
        self.emit(RunEvent::RunFinished {
            reason: FinishReason::Exhausted,
            response,
        });
        Ok(RunStatus::Exhausted)
    }
}
