//! Outbound message delivery port.
//!
//! The controller never talks to a chat network directly; it hands lines
//! to whatever [`MessageSink`] the embedding application wired in. This
//! replaces an ambient global message queue with explicit context.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one line to the audience. Best effort; delivery failures
    /// are the sink's problem, not the controller's.
    async fn send(&self, line: &str);
}

/// Discards everything. For embedders that do not announce.
pub struct NullSink;

#[async_trait]
impl MessageSink for NullSink {
    async fn send(&self, _line: &str) {}
}

/// Collects lines in memory. Meant for tests and dry runs.
#[derive(Default, Clone)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().await)
    }
}

#[async_trait]
impl MessageSink for BufferSink {
    async fn send(&self, line: &str) {
        self.lines.lock().await.push(line.to_string());
    }
}
