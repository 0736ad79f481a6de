//! Lifecycle and failure notifications.
//!
//! The worker reports what it does through a broadcast channel instead of
//! callbacks. Subscribers that lag behind lose the oldest events; nothing in
//! the cache waits on a subscriber.

use precache_core::{GenerationId, RequestKey};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Something observable happened to a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Install finished and the generation may take over immediately.
    ReadyToTakeOver {
        /// The freshly installed generation.
        generation: GenerationId,
    },
    /// Install failed; any previously active generation keeps serving.
    InstallFailed {
        /// The generation that was abandoned.
        generation: GenerationId,
        /// Human-readable cause.
        reason: String,
    },
    /// Cleanup finished and the generation now answers intercepted requests.
    Serving {
        /// The current generation.
        generation: GenerationId,
    },
    /// An obsolete generation could not be deleted.
    SweepFailed {
        /// The generation that survived cleanup.
        generation: GenerationId,
        /// Human-readable cause.
        reason: String,
    },
    /// A network response could not be written back.
    WriteBackFailed {
        /// The generation the write targeted.
        generation: GenerationId,
        /// The request whose response was lost.
        key: RequestKey,
        /// Human-readable cause.
        reason: String,
    },
}

/// Cloneable sender side of the event channel.
#[derive(Debug, Clone)]
pub struct Events {
    sender: broadcast::Sender<CacheEvent>,
}

impl Events {
    /// Creates a channel keeping at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    /// Emits an event. Having no subscribers is not an error.
    pub fn emit(&self, event: CacheEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
