use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use precache_core::Offload;
use smol_str::SmolStr;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, info_span};

use super::policy::{OffloadConfig, Outcome};

#[cfg(feature = "metrics")]
use crate::metrics::{
    OFFLOAD_TASK_DURATION, OFFLOAD_TASKS_ACTIVE, OFFLOAD_TASKS_FINISHED, OFFLOAD_TASKS_SPAWNED,
};

/// Identifies a spawned task: its kind plus a per-manager sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    kind: SmolStr,
    id: u64,
}

impl OffloadKey {
    /// Kind of the task (e.g. "write_back"). Used as the metrics label.
    pub fn kind(&self) -> &SmolStr {
        &self.kind
    }

    /// Sequence number within the manager.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for OffloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[derive(Debug)]
struct Tasks {
    config: OffloadConfig,
    running: DashMap<OffloadKey, JoinHandle<()>>,
    live: watch::Sender<usize>,
    next_id: AtomicU64,
}

impl Default for Tasks {
    fn default() -> Self {
        let (live, _) = watch::channel(0);
        Self {
            config: OffloadConfig::default(),
            running: DashMap::new(),
            live,
            next_id: AtomicU64::new(0),
        }
    }
}

/// Settles a task's bookkeeping when its future is dropped, which also
/// happens when the task is aborted before or while running.
struct Settle {
    key: OffloadKey,
    tasks: Arc<Tasks>,
    settled: Arc<AtomicBool>,
    started: Instant,
    outcome: Outcome,
}

impl Drop for Settle {
    fn drop(&mut self) {
        record(&self.key, self.outcome, self.started.elapsed());
        self.settled.store(true, Ordering::SeqCst);
        self.tasks.running.remove(&self.key);
        self.tasks.live.send_modify(|live| *live = live.saturating_sub(1));
    }
}

/// Runs write-backs on the Tokio runtime, detached from the request that
/// produced them.
///
/// Clones share the same task table, so a test can hold one clone and
/// [`wait_all`](Self::wait_all) for write-backs spawned through another.
/// Tasks are never deduplicated: two write-backs for the same key both run
/// and the store keeps whichever lands last.
#[derive(Clone, Debug, Default)]
pub struct OffloadManager {
    tasks: Arc<Tasks>,
}

impl OffloadManager {
    /// Creates a manager applying `config` to every task.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            tasks: Arc::new(Tasks {
                config,
                ..Tasks::default()
            }),
        }
    }

    /// Spawns `task` in the background. Must be called within a Tokio runtime.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = OffloadKey {
            kind: kind.into(),
            id: self.tasks.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);
        let policy = self.tasks.config.timeout_policy;
        let settled = Arc::new(AtomicBool::new(false));
        let mut settle = Settle {
            key: key.clone(),
            tasks: self.tasks.clone(),
            settled: settled.clone(),
            started: Instant::now(),
            outcome: Outcome::Aborted,
        };

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => key.kind.to_string()).increment(1);
            metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => key.kind.to_string()).increment(1.0);
        }

        self.tasks.live.send_modify(|live| *live += 1);
        let handle = tokio::spawn(
            async move {
                let task_key = settle.key.clone();
                settle.outcome = policy.run(&task_key, task).await;
            }
            .instrument(span),
        );
        self.tasks.running.insert(key.clone(), handle);
        // The task may have settled before its handle was registered.
        if settled.load(Ordering::SeqCst) {
            self.tasks.running.remove(&key);
        }
        key
    }

    /// Number of tasks that have not ended yet.
    pub fn active_task_count(&self) -> usize {
        *self.tasks.live.borrow()
    }

    /// Aborts every running task. Their writes are lost.
    pub fn abort_all(&self) {
        let keys: Vec<OffloadKey> = self
            .tasks
            .running
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys {
            if let Some((_, handle)) = self.tasks.running.remove(&key) {
                handle.abort();
            }
        }
    }

    /// Waits until every task has ended, including tasks spawned while
    /// waiting.
    pub async fn wait_all(&self) {
        let mut live = self.tasks.live.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = live.wait_for(|count| *count == 0).await;
    }

    /// Like [`wait_all`](Self::wait_all), but gives up after `timeout`.
    /// Returns `false` when tasks were still running.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }
}

#[cfg(feature = "metrics")]
fn record(key: &OffloadKey, outcome: Outcome, elapsed: Duration) {
    let kind = key.kind.to_string();
    metrics::counter!(*OFFLOAD_TASKS_FINISHED, "kind" => kind.clone(), "outcome" => outcome.as_str())
        .increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.clone()).decrement(1.0);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind).record(elapsed.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
fn record(_key: &OffloadKey, _outcome: Outcome, _elapsed: Duration) {}

impl Offload for OffloadManager {
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        OffloadManager::spawn(self, kind, future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_wait_all_drains_tasks() {
        let manager = OffloadManager::default();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let done = done.clone();
            manager.spawn("write_back", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[tokio::test]
    async fn test_same_kind_is_not_deduplicated() {
        let manager = OffloadManager::default();
        let first = manager.spawn("write_back", async {});
        let second = manager.spawn("write_back", async {});
        assert_ne!(first, second);
        assert_eq!(first.kind(), "write_back");
        assert_eq!(second.to_string(), "write_back#1");
        manager.wait_all().await;
    }

    #[tokio::test]
    async fn test_cancel_policy_drops_slow_task() {
        let manager = OffloadManager::new(OffloadConfig::cancel_after(Duration::from_millis(10)));
        let finished = Arc::new(AtomicUsize::new(0));

        let flag = finished.clone();
        manager.spawn("write_back", async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });

        assert!(manager.wait_all_timeout(Duration::from_secs(5)).await);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_all_stops_running_tasks() {
        let manager = OffloadManager::default();
        manager.spawn("write_back", tokio::time::sleep(Duration::from_secs(60)));
        manager.spawn("write_back", tokio::time::sleep(Duration::from_secs(60)));
        assert_eq!(manager.active_task_count(), 2);

        manager.abort_all();
        assert!(manager.wait_all_timeout(Duration::from_secs(5)).await);
        assert_eq!(manager.active_task_count(), 0);
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_aborted_task_is_dropped_and_settled() {
        let manager = OffloadManager::default();
        let dropped = Arc::new(AtomicBool::new(false));

        let flag = DropFlag(dropped.clone());
        manager.spawn("write_back", async move {
            let _flag = flag;
            std::future::pending::<()>().await;
        });
        manager.abort_all();
        manager.wait_all().await;

        assert!(dropped.load(Ordering::SeqCst));
        assert!(manager.tasks.running.is_empty());
    }

    // With the clock paused the runtime only advances time while idle, so
    // this finishes only if `wait_all` parks instead of polling.
    #[tokio::test(start_paused = true)]
    async fn test_wait_all_parks_until_tasks_end() {
        let manager = OffloadManager::default();
        let done = Arc::new(AtomicUsize::new(0));

        let counter = done.clone();
        manager.spawn("write_back", async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_all_timeout_keeps_tracking_tasks() {
        let manager = OffloadManager::default();
        manager.spawn("write_back", tokio::time::sleep(Duration::from_secs(60)));

        assert!(!manager.wait_all_timeout(Duration::from_millis(10)).await);
        assert_eq!(manager.active_task_count(), 1);

        manager.abort_all();
        assert!(manager.wait_all_timeout(Duration::from_secs(5)).await);
    }
}
