//! Deadlines for write-back tasks.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use super::manager::OffloadKey;

/// What to do with a write-back that is still running after a deadline.
///
/// ```yaml
/// timeout_policy: none
/// # or
/// timeout_policy:
///   cancel: 5s
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Let every write-back run to completion.
    #[default]
    None,
    /// Drop the write-back once the deadline passes. The response it carried
    /// is simply not persisted.
    Cancel(#[serde(with = "humantime_serde")] Duration),
    /// Let the write-back finish but log that it was slow.
    Warn(#[serde(with = "humantime_serde")] Duration),
}

/// How a task ended under its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed,
    Cancelled,
    /// Dropped through `abort_all` or runtime shutdown.
    Aborted,
}

impl Outcome {
    #[cfg(feature = "metrics")]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Cancelled => "cancelled",
            Outcome::Aborted => "aborted",
        }
    }
}

impl TimeoutPolicy {
    /// Drives `task` to its end under this policy.
    pub(crate) async fn run<F>(self, key: &OffloadKey, task: F) -> Outcome
    where
        F: Future<Output = ()>,
    {
        match self {
            TimeoutPolicy::None => {
                task.await;
                Outcome::Completed
            }
            TimeoutPolicy::Cancel(deadline) => match tokio::time::timeout(deadline, task).await {
                Ok(()) => Outcome::Completed,
                Err(_) => {
                    warn!(%key, ?deadline, "write-back dropped after deadline");
                    Outcome::Cancelled
                }
            },
            TimeoutPolicy::Warn(deadline) => {
                let started = Instant::now();
                task.await;
                let elapsed = started.elapsed();
                if elapsed > deadline {
                    warn!(%key, ?elapsed, ?deadline, "slow write-back");
                }
                Outcome::Completed
            }
        }
    }
}

/// Settings of the [`OffloadManager`](super::OffloadManager).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OffloadConfig {
    /// Deadline handling for every spawned task.
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

impl OffloadConfig {
    /// Drops write-backs still running after `deadline`.
    pub fn cancel_after(deadline: Duration) -> Self {
        Self {
            timeout_policy: TimeoutPolicy::Cancel(deadline),
        }
    }

    /// Logs write-backs still running after `deadline`.
    pub fn warn_after(deadline: Duration) -> Self {
        Self {
            timeout_policy: TimeoutPolicy::Warn(deadline),
        }
    }
}
