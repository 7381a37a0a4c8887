use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::SourceKey;

/// Fan-out channel passed to whoever needs to publish or observe events.
///
/// Cloning shares the underlying channel. Emitting with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct EventBus<E: Clone> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn emit(&self, event: E) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Authentication events raised by API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// The backend rejected the session token.
    Unauthorized { path: String },
}

/// Notifications from a citation session to its renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The active source changed; the renderer should show the excerpt immediately.
    ActiveChanged { index: usize, key: SourceKey },
    /// Content for `key` landed in the cache.
    ContentResolved { key: SourceKey },
    PanelClosed,
}
