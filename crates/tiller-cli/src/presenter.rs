//! Console presentation for run events
//!
//! The core emits structured events; everything printed lives here.

use std::io::{stdout, Write};

use loop_core::{
    Decision, DecisionKind, EventSink, FinishReason, RunEvent, StreamHandler, ToolStatus,
};

// ANSI colors
const GREEN: &str = "\x1b[92m";
const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RATIONALE_PREVIEW_CHARS: usize = 100;

/// Prints run progress to the console.
pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn new() -> Self {
        Self
    }

    fn print_decision(&self, step: usize, decision: &Decision) {
        let rationale: String = decision
            .rationale
            .chars()
            .take(RATIONALE_PREVIEW_CHARS)
            .collect();
        let ellipsis = if decision.rationale.chars().count() > RATIONALE_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };

        match &decision.kind {
            DecisionKind::Tool { name, arguments } => {
                println!(
                    "{}[Step {}]{} {}tool{} {} {}{}{}",
                    DIM,
                    step,
                    RESET,
                    CYAN,
                    RESET,
                    name,
                    DIM,
                    serde_json::Value::Object(arguments.clone()),
                    RESET
                );
            }
            DecisionKind::Hitl { request } => {
                println!(
                    "{}[Step {}]{} {}hitl{} {}",
                    DIM, step, RESET, YELLOW, RESET, request
                );
            }
            DecisionKind::Final { .. } => {
                println!("{}[Step {}]{} {}final{}", DIM, step, RESET, GREEN, RESET);
            }
        }
        if !rationale.is_empty() {
            println!("  {}{}{}{}", DIM, rationale, ellipsis, RESET);
        }
    }
}

impl EventSink for ConsolePresenter {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                goal,
                user_messages,
                history_len,
            } => {
                println!();
                println!("{}[Agent starting]{} {}", BLUE, RESET, goal);
                println!(
                    "  {}messages: {} | history: {} entries{}",
                    DIM, user_messages, history_len, RESET
                );
            }
            RunEvent::DecisionMade { step, decision } => {
                self.print_decision(*step, decision);
            }
            RunEvent::ToolExecuted { tool, result, .. } => {
                let (color, label) = match result.status {
                    ToolStatus::Success => (GREEN, "ok"),
                    ToolStatus::Error => (YELLOW, "failed"),
                };
                println!(
                    "  {}{}{} [{}{}{}]: {}",
                    CYAN, tool, RESET, color, label, RESET, result.message
                );
            }
            RunEvent::HumanInputRequested { .. } => {
                // The console channel renders its own prompt.
            }
            RunEvent::HumanInputReceived { response, .. } => {
                println!("  {}human:{} {}", YELLOW, RESET, response);
            }
            RunEvent::RunFinished { reason, response } => {
                println!();
                match reason {
                    FinishReason::Final => {
                        println!("{}[Final response]{}", GREEN, RESET);
                    }
                    FinishReason::Exhausted => {
                        println!("{}[Step bound reached]{}", YELLOW, RESET);
                    }
                }
                println!("{}", response);
            }
        }
    }
}

/// Stream handler that prints tokens as they arrive.
pub struct ConsoleStream;

impl ConsoleStream {
    pub fn new() -> Self {
        Self
    }
}

impl StreamHandler for ConsoleStream {
    fn on_token(&self, token: &str) {
        print!("{}", token);
        let _ = stdout().flush();
    }

    fn on_complete(&self, _full_text: &str) {
        // The presenter prints the final response panel; nothing to add.
    }
}
