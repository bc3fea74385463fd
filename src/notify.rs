//! Change notification for live viewers.
//!
//! The store calls [`ChangeNotifier::notify`] after a mutation commits.
//! Delivery is best effort; a notifier never reports failure back to the
//! mutating caller.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// What changed. Forwarded verbatim to websocket clients by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Operation that produced the change (`add_prompt`, `select_suite`, ...).
    pub op: String,
    /// Suite the change applies to, if any.
    pub suite_id: Option<i64>,
    /// Unix milliseconds.
    pub at: i64,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(op: impl Into<String>, suite_id: Option<i64>) -> Self {
        Self {
            op: op.into(),
            suite_id,
            at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Fire-and-forget sink for change events.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, event: ChangeEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _event: ChangeEvent) {}
}

/// Fans events out to every current subscriber over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastNotifier {
    /// Channel depth; slow subscribers lag rather than block writers.
    pub const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive all events sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, event: ChangeEvent) {
        if let Err(e) = self.sender.send(event) {
            debug!(op = %e.0.op, "No change subscribers");
        }
    }
}
