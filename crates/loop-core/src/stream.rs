//! Streaming hooks for text output
//!
//! Streaming is a transport concern, orthogonal to decision making. The
//! orchestrator only calls `on_complete` with the final response; hosts that
//! stream tokens do so through their own oracle integration.

use std::sync::Mutex;

/// Handler for streamed text output.
pub trait StreamHandler: Send + Sync {
    /// Handle a single streamed token.
    fn on_token(&self, token: &str);

    /// Called once the full text is available.
    fn on_complete(&self, full_text: &str);
}

/// No-op handler for when streaming is not needed.
pub struct NullStream;

impl StreamHandler for NullStream {
    fn on_token(&self, _token: &str) {}

    fn on_complete(&self, _full_text: &str) {}
}

/// Handler that collects tokens into a buffer, with an optional per-token
/// callback for embedding hosts.
#[derive(Default)]
pub struct BufferedStream {
    buffer: Mutex<String>,
    token_callback: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl BufferedStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_callback(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            buffer: Mutex::new(String::new()),
            token_callback: Some(Box::new(callback)),
        }
    }

    /// The text buffered so far.
    pub fn text(&self) -> String {
        self.buffer.lock().expect("stream buffer lock poisoned").clone()
    }

    pub fn reset(&self) {
        self.buffer.lock().expect("stream buffer lock poisoned").clear();
    }
}

impl StreamHandler for BufferedStream {
    fn on_token(&self, token: &str) {
        self.buffer
            .lock()
            .expect("stream buffer lock poisoned")
            .push_str(token);
        if let Some(callback) = &self.token_callback {
            callback(token);
        }
    }

    fn on_complete(&self, full_text: &str) {
        let mut buffer = self.buffer.lock().expect("stream buffer lock poisoned");
        buffer.clear();
        buffer.push_str(full_text);
    }
}
