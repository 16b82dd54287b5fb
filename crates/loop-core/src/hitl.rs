//! Human-in-the-loop channels
//!
//! A HITL request is a first-class decision outcome; the human's answer is
//! folded back into history as data. A channel must either answer
//! synchronously or report the request as pending - it never drops one.

use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Outcome of asking a channel for human input.
///
/// `Pending` is a suspension signal, not an error: the host should park the
/// run, collect the answer out of band, and re-invoke the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitlReply {
    /// The human answered; the loop folds this into history and continues.
    Answered(String),
    /// No answer is available yet; the run suspends.
    Pending,
}

/// Boundary for requesting human input.
#[async_trait]
pub trait HitlChannel: Send + Sync {
    async fn request_human_input(&self, request: &str) -> Result<HitlReply>;
}

/// Channel that blocks on console input.
pub struct ConsoleChannel;

#[async_trait]
impl HitlChannel for ConsoleChannel {
    async fn request_human_input(&self, request: &str) -> Result<HitlReply> {
        println!();
        println!("\x1b[93m[Human input required]\x1b[0m {}", request);
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader
            .read_line(&mut line)
            .await
            .context("Failed to read human input from stdin")?;

        Ok(HitlReply::Answered(
            line.trim_end_matches(['\r', '\n']).to_string(),
        ))
    }
}

/// Channel that delegates to an injected function.
///
/// Useful when a host application supplies input through its own UI or API.
pub struct CallbackChannel {
    callback: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl CallbackChannel {
    pub fn new(callback: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl HitlChannel for CallbackChannel {
    async fn request_human_input(&self, request: &str) -> Result<HitlReply> {
        Ok(HitlReply::Answered((self.callback)(request)))
    }
}

#[derive(Default)]
struct QueuedState {
    pending: Option<String>,
    response: Option<String>,
}

/// Non-blocking channel for hosts that cannot block mid-run.
///
/// The first request records itself and reports `Pending`; after the host
/// calls `provide_response`, re-invoking the loop consumes the queued answer
/// instead of re-prompting.
#[derive(Default)]
pub struct QueuedChannel {
    state: Mutex<QueuedState>,
}

impl QueuedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request currently waiting for an answer, if any.
    pub fn pending_request(&self) -> Option<String> {
        self.state
            .lock()
            .expect("hitl queue lock poisoned")
            .pending
            .clone()
    }

    /// Supply the answer for the pending request.
    pub fn provide_response(&self, response: impl Into<String>) {
        let mut state = self.state.lock().expect("hitl queue lock poisoned");
        state.response = Some(response.into());
        state.pending = None;
        info!("Queued HITL response provided");
    }
}

#[async_trait]
impl HitlChannel for QueuedChannel {
    async fn request_human_input(&self, request: &str) -> Result<HitlReply> {
        let mut state = self.state.lock().expect("hitl queue lock poisoned");

        if let Some(answer) = state.response.take() {
            debug!("Returning queued HITL response");
            return Ok(HitlReply::Answered(answer));
        }

        state.pending = Some(request.to_string());
        debug!(request = %request, "HITL request queued as pending");
        Ok(HitlReply::Pending)
    }
}
