//! Generation installation.
//!
//! Installing a generation fetches every manifest resource and stores the
//! responses under the new generation. It is all or nothing: the entries are
//! only written once every fetch succeeded, and a failed install removes the
//! generation if the attempt created it. Reinstalling a generation that is
//! already present never deletes it, so a live generation of the same name
//! keeps serving.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use http::{Request, Response};
use precache_backend::{Backend, BackendError, OpenStatus};
use precache_core::{CachedResponse, GenerationId, Manifest, Origin, RequestKey, Upstream};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{FailureReason, InstallError, ResourceFailure};
use crate::events::{CacheEvent, Events};
use crate::network::fetch;

#[cfg(feature = "metrics")]
use crate::metrics::INSTALL_COUNTER;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// The installed generation.
    pub generation: GenerationId,
    /// Number of entries written.
    pub entries: usize,
}

/// Populates a generation from a manifest.
#[derive(Debug)]
pub struct Installer<B> {
    backend: Arc<B>,
    events: Events,
    origin: Option<Origin>,
    fetch_timeout: Option<Duration>,
}

impl<B> Clone for Installer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            events: self.events.clone(),
            origin: self.origin.clone(),
            fetch_timeout: self.fetch_timeout,
        }
    }
}

impl<B> Installer<B>
where
    B: Backend,
{
    /// Creates an installer writing into `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            events: Events::default(),
            origin: None,
            fetch_timeout: None,
        }
    }

    /// Reports lifecycle events on `events`.
    pub fn events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    /// Resolves origin-form manifest entries against `origin`.
    pub fn origin(mut self, origin: Option<Origin>) -> Self {
        self.origin = origin;
        self
    }

    /// Bounds every manifest fetch.
    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Fetches every resource of `manifest` and stores it under `generation`.
    ///
    /// Fetches run concurrently, each through its own clone of `upstream`.
    /// A resource counts as failed when the network errors, times out or
    /// answers with a non-success status. On failure every failing resource
    /// is reported, and `generation` is only removed from the store when this
    /// call created it.
    pub async fn install<U, ReqBody, E>(
        &self,
        generation: &GenerationId,
        manifest: &Manifest,
        upstream: U,
    ) -> Result<InstallReport, InstallError>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>> + Clone,
        ReqBody: Default,
        E: Display,
    {
        let span = info_span!(
            "precache.install",
            generation = %generation,
            resources = manifest.len(),
            backend = %self.backend.label(),
        );
        let result = self
            .install_inner(generation, manifest, upstream)
            .instrument(span)
            .await;

        match &result {
            Ok(report) => {
                info!(%generation, entries = report.entries, "generation installed");
                #[cfg(feature = "metrics")]
                metrics::counter!(*INSTALL_COUNTER, "result" => "ok").increment(1);
                self.events.emit(CacheEvent::ReadyToTakeOver {
                    generation: generation.clone(),
                });
            }
            Err(err) => {
                error!(%generation, error = %err, "cache install failed");
                #[cfg(feature = "metrics")]
                metrics::counter!(*INSTALL_COUNTER, "result" => "failed").increment(1);
                self.events.emit(CacheEvent::InstallFailed {
                    generation: generation.clone(),
                    reason: err.to_string(),
                });
            }
        }
        result
    }

    async fn install_inner<U, ReqBody, E>(
        &self,
        generation: &GenerationId,
        manifest: &Manifest,
        upstream: U,
    ) -> Result<InstallReport, InstallError>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>> + Clone,
        ReqBody: Default,
        E: Display,
    {
        let fetches = manifest.iter().map(|resource| {
            let mut upstream = upstream.clone();
            let uri = resource.resolve(self.origin.as_ref());
            let timeout = self.fetch_timeout;
            async move {
                let key = RequestKey::get(uri.clone());
                let mut request = Request::new(ReqBody::default());
                *request.uri_mut() = uri;
                let outcome = match fetch(&mut upstream, request, timeout).await {
                    Ok(response) if response.status().is_success() => Ok(response),
                    Ok(response) => Err(FailureReason::Status(response.status())),
                    Err(err) => Err(FailureReason::Network(err.to_string())),
                };
                (resource, key, outcome)
            }
        });

        let mut entries = Vec::with_capacity(manifest.len());
        let mut failures = Vec::new();
        for (resource, key, outcome) in join_all(fetches).await {
            match outcome {
                Ok(response) => {
                    debug!(%key, status = %response.status(), "resource fetched");
                    entries.push((key, CachedResponse::from_response(response)));
                }
                Err(reason) => {
                    warn!(resource = %resource, %reason, "resource unreachable");
                    failures.push(ResourceFailure {
                        resource: resource.clone(),
                        reason,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(InstallError::Unreachable {
                generation: generation.clone(),
                failures,
                total: manifest.len(),
            });
        }

        let written = entries.len();
        if let Err(source) = self.store(generation, entries).await {
            return Err(InstallError::Backend {
                generation: generation.clone(),
                source,
            });
        }

        Ok(InstallReport {
            generation: generation.clone(),
            entries: written,
        })
    }

    async fn store(
        &self,
        generation: &GenerationId,
        entries: Vec<(RequestKey, CachedResponse)>,
    ) -> Result<(), BackendError> {
        let opened = self.backend.open(generation).await?;
        for (key, response) in entries {
            if let Err(err) = self.backend.write(generation, &key, response).await {
                match opened {
                    OpenStatus::Created => self.discard(generation).await,
                    OpenStatus::Existing => {
                        warn!(%generation, "generation existed before this install, keeping it")
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    async fn discard(&self, generation: &GenerationId) {
        if let Err(err) = self.backend.delete_generation(generation).await {
            warn!(%generation, error = %err, "failed to discard partial generation");
        }
    }
}
