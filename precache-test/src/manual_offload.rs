//! Offload that holds tasks until the test releases them.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use precache_core::{Offload, SmolStr};

/// Queues every spawned task instead of running it.
///
/// Lets a test decide when a write-back lands relative to other lifecycle
/// steps. Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualOffload {
    queued: Arc<Mutex<Vec<(SmolStr, BoxFuture<'static, ()>)>>>,
}

impl ManualOffload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds of the tasks waiting to run, in spawn order.
    pub fn queued(&self) -> Vec<String> {
        self.queued
            .lock()
            .map(|queued| queued.iter().map(|(kind, _)| kind.to_string()).collect())
            .unwrap_or_default()
    }

    /// Runs every queued task to completion, one after another.
    pub async fn release(&self) {
        let tasks = self
            .queued
            .lock()
            .map(|mut queued| std::mem::take(&mut *queued))
            .unwrap_or_default();
        for (_, task) in tasks {
            task.await;
        }
    }
}

impl Offload for ManualOffload {
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push((kind.into(), Box::pin(future)));
        }
    }
}
