//! Progress reporting.
//!
//! The pipeline emits one human-readable message per stage transition.
//! Delivery is fire-and-forget: a sink absorbs its own failures and never
//! slows down or aborts the run.

use async_trait::async_trait;

/// Receiver for pipeline progress messages.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Prints progress to stdout. Used by the CLI binary.
pub struct StdoutSink;

#[async_trait]
impl ProgressSink for StdoutSink {
    async fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

/// Discards all progress messages.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn notify(&self, _message: &str) {}
}

/// Records messages in order for test assertions.
#[derive(Default)]
pub struct RecordingSink {
    messages: std::sync::Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
