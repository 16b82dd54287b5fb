//! Structured run events
//!
//! The core performs no console I/O. Anything worth showing a user is
//! emitted as a `RunEvent` to registered sinks; presenters live outside the
//! state machine.

use crate::decision::Decision;
use crate::tools::ToolResult;

/// Why a run reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The oracle chose a final response.
    Final,
    /// The step bound was exhausted.
    Exhausted,
}

/// Events emitted by the orchestrator as the loop progresses.
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        goal: String,
        user_messages: usize,
        history_len: usize,
    },
    DecisionMade {
        step: usize,
        decision: Decision,
    },
    ToolExecuted {
        step: usize,
        tool: String,
        result: ToolResult,
    },
    HumanInputRequested {
        step: usize,
        request: String,
    },
    HumanInputReceived {
        step: usize,
        response: String,
    },
    RunFinished {
        reason: FinishReason,
        response: String,
    },
}

/// Subscriber to run events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that records every event for assertions.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub events: Arc<Mutex<Vec<RunEvent>>>,
    }

    impl EventSink for RecordingSink {
        fn on_event(&self, event: &RunEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
