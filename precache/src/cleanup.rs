//! Removal of obsolete generations.

use std::sync::Arc;

use futures::future::join_all;
use precache_backend::{Backend, BackendError, DeleteStatus};
use precache_core::GenerationId;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::events::{CacheEvent, Events};

#[cfg(feature = "metrics")]
use crate::metrics::SWEPT_GENERATIONS_COUNTER;

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Generations that were deleted.
    pub deleted: Vec<GenerationId>,
    /// Generations that could not be deleted, with the cause.
    pub failed: Vec<(GenerationId, String)>,
}

impl SweepReport {
    /// `true` when no obsolete generation remained to be deleted.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.failed.is_empty()
    }
}

/// Deletes every generation except the current one.
#[derive(Debug)]
pub struct Cleanup<B> {
    backend: Arc<B>,
    events: Events,
}

impl<B> Clone for Cleanup<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            events: self.events.clone(),
        }
    }
}

impl<B> Cleanup<B>
where
    B: Backend,
{
    /// Creates a cleanup over `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            events: Events::default(),
        }
    }

    /// Reports sweep failures and the final `Serving` event on `events`.
    pub fn events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    /// Deletes all generations other than `current`.
    ///
    /// Deletions run concurrently. A deletion that fails is logged, reported
    /// in the result and as [`CacheEvent::SweepFailed`], and does not stop
    /// the others. Only failing to list generations is an error.
    pub async fn sweep(&self, current: &GenerationId) -> Result<SweepReport, BackendError> {
        let span = info_span!("precache.cleanup", current = %current);
        async {
            let victims: Vec<GenerationId> = self
                .backend
                .generations()
                .await?
                .into_iter()
                .filter(|generation| generation != current)
                .collect();

            let deletions = victims.into_iter().map(|generation| async move {
                let result = self.backend.delete_generation(&generation).await;
                (generation, result)
            });

            let mut report = SweepReport::default();
            for (generation, result) in join_all(deletions).await {
                match result {
                    Ok(DeleteStatus::Deleted(entries)) => {
                        debug!(%generation, entries, "obsolete generation deleted");
                        report.deleted.push(generation);
                    }
                    // Someone else removed it first.
                    Ok(DeleteStatus::Missing) => {
                        debug!(%generation, "obsolete generation already gone");
                    }
                    Err(err) => {
                        warn!(%generation, error = %err, "failed to delete obsolete generation");
                        self.events.emit(CacheEvent::SweepFailed {
                            generation: generation.clone(),
                            reason: err.to_string(),
                        });
                        report.failed.push((generation, err.to_string()));
                    }
                }
            }

            #[cfg(feature = "metrics")]
            metrics::counter!(*SWEPT_GENERATIONS_COUNTER).increment(report.deleted.len() as u64);

            info!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "cleanup finished"
            );
            self.events.emit(CacheEvent::Serving {
                generation: current.clone(),
            });
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
