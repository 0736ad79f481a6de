//! Cache-first request interception.
//!
//! For every outgoing request the interceptor decides where the answer comes
//! from:
//!
//! ```text
//!   method != GET ──────────────────────────────► network, untouched (Bypassed)
//!   GET ── generation superseded ───────────────► network, untouched (Bypassed)
//!       └─ current generation has key ──────────► stored copy (Cached)
//!       └─ miss ── network ok ──┬───────────────► network copy (Network)
//!                               └─ write-back ──► detached task, never awaited
//!                └─ network failed ─────────────► error (Unresolved)
//! ```
//!
//! Only the current generation is ever consulted. Once a newer generation
//! is promoted in the store, an interceptor of an older one neither reads
//! nor writes back; it forwards every request to the network.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Response};
use precache_backend::{Backend, BackendError};
use precache_core::{CacheStatus, CachedResponse, GenerationId, Offload, RequestKey, Upstream};
use tracing::{Instrument, debug, debug_span, warn};

use crate::error::FetchError;
use crate::events::{CacheEvent, Events};
use crate::network::fetch;
use crate::offload::OffloadManager;

#[cfg(feature = "metrics")]
use crate::metrics::{
    BYPASS_COUNTER, HIT_COUNTER, MISS_COUNTER, UNRESOLVED_COUNTER, WRITE_BACK_FAILED_COUNTER,
};

/// How an intercepted request was answered.
#[derive(Debug)]
pub enum Resolution<E> {
    /// Served from the current generation; the network was not contacted.
    Cached(Response<Bytes>),
    /// Fetched from the network after a miss; a copy is being written back.
    Network(Response<Bytes>),
    /// Not a `GET`, or the generation was superseded: forwarded without
    /// touching the cache.
    Bypassed(Result<Response<Bytes>, FetchError<E>>),
    /// Cache miss and the network produced no response.
    Unresolved(FetchError<E>),
}

impl<E> Resolution<E> {
    /// The cache status of this resolution.
    pub fn status(&self) -> CacheStatus {
        match self {
            Resolution::Cached(_) => CacheStatus::Hit,
            Resolution::Network(_) => CacheStatus::Miss,
            Resolution::Bypassed(_) => CacheStatus::Bypass,
            Resolution::Unresolved(_) => CacheStatus::Unresolved,
        }
    }

    /// Collapses the resolution into what the caller of the request sees.
    pub fn into_result(self) -> Result<Response<Bytes>, FetchError<E>> {
        match self {
            Resolution::Cached(response) | Resolution::Network(response) => Ok(response),
            Resolution::Bypassed(result) => result,
            Resolution::Unresolved(error) => Err(error),
        }
    }

    /// Returns the response, if any.
    pub fn into_response(self) -> Option<Response<Bytes>> {
        self.into_result().ok()
    }
}

/// Answers requests from the current generation, falling back to the
/// network.
///
/// Cheap to clone; clones share the store and the offload manager.
pub struct Interceptor<B, O = OffloadManager> {
    backend: Arc<B>,
    generation: GenerationId,
    offload: O,
    events: Events,
    fetch_timeout: Option<Duration>,
}

impl<B, O: Clone> Clone for Interceptor<B, O> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            generation: self.generation.clone(),
            offload: self.offload.clone(),
            events: self.events.clone(),
            fetch_timeout: self.fetch_timeout,
        }
    }
}

impl<B, O> std::fmt::Debug for Interceptor<B, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("generation", &self.generation)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl<B> Interceptor<B, OffloadManager>
where
    B: Backend + 'static,
{
    /// Creates an interceptor serving `generation` with a default offload
    /// manager.
    ///
    /// Usually obtained from an activated
    /// [`CacheWorker`](crate::CacheWorker) instead.
    pub fn new(backend: Arc<B>, generation: GenerationId) -> Self {
        Self::with_offload(backend, generation, OffloadManager::default())
    }
}

impl<B, O> Interceptor<B, O>
where
    B: Backend + 'static,
    O: Offload,
{
    /// Creates an interceptor that writes back through `offload`.
    pub fn with_offload(backend: Arc<B>, generation: GenerationId, offload: O) -> Self {
        Self {
            backend,
            generation,
            offload,
            events: Events::default(),
            fetch_timeout: None,
        }
    }

    /// Reports write-back failures on `events`.
    pub fn events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    /// Bounds every network fetch.
    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The generation this interceptor serves from.
    pub fn generation(&self) -> &GenerationId {
        &self.generation
    }

    /// The offload used for write-back.
    pub fn offload(&self) -> &O {
        &self.offload
    }

    /// Whether another generation has been promoted in the store.
    pub fn is_superseded(&self) -> bool {
        self.backend.active().is_superseded(&self.generation)
    }

    /// Resolves `request`, consulting the current generation first.
    ///
    /// `upstream` is only called on a miss or for non-`GET` requests. A
    /// network response is returned to the caller right away; storing it is
    /// a detached task whose failure never changes the returned resolution.
    pub async fn intercept<U, ReqBody, E>(
        &self,
        request: Request<ReqBody>,
        mut upstream: U,
    ) -> Resolution<E>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>>,
    {
        if request.method() != Method::GET {
            debug!(method = %request.method(), uri = %request.uri(), "bypass");
            #[cfg(feature = "metrics")]
            metrics::counter!(*BYPASS_COUNTER).increment(1);
            return Resolution::Bypassed(
                fetch(&mut upstream, request, self.fetch_timeout).await,
            );
        }

        let key = RequestKey::from_request(&request);
        let span = debug_span!(
            "precache.intercept",
            key = %key,
            generation = %self.generation,
        );
        self.resolve(key, request, upstream).instrument(span).await
    }

    async fn resolve<U, ReqBody, E>(
        &self,
        key: RequestKey,
        request: Request<ReqBody>,
        mut upstream: U,
    ) -> Resolution<E>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>>,
    {
        if self.is_superseded() {
            debug!(active = ?self.backend.active().get(), "generation superseded, bypass");
            #[cfg(feature = "metrics")]
            metrics::counter!(*BYPASS_COUNTER).increment(1);
            return Resolution::Bypassed(fetch(&mut upstream, request, self.fetch_timeout).await);
        }

        match self.backend.read(&self.generation, &key).await {
            Ok(Some(cached)) => {
                debug!("hit");
                #[cfg(feature = "metrics")]
                metrics::counter!(*HIT_COUNTER).increment(1);
                return Resolution::Cached(cached.into_response());
            }
            Ok(None) => debug!("miss"),
            Err(err) => warn!(error = %err, "cache read failed, treating as miss"),
        }

        match fetch(&mut upstream, request, self.fetch_timeout).await {
            Ok(response) => {
                #[cfg(feature = "metrics")]
                metrics::counter!(*MISS_COUNTER).increment(1);
                let snapshot = CachedResponse::from_response(response);
                let response = snapshot.clone().into_response();
                self.write_back(key, snapshot);
                Resolution::Network(response)
            }
            Err(err) => {
                debug!(timeout = err.is_timeout(), "unresolved");
                #[cfg(feature = "metrics")]
                metrics::counter!(*UNRESOLVED_COUNTER).increment(1);
                Resolution::Unresolved(err)
            }
        }
    }

    fn write_back(&self, key: RequestKey, snapshot: CachedResponse) {
        let backend = self.backend.clone();
        let generation = self.generation.clone();
        let events = self.events.clone();
        self.offload.spawn("write_back", async move {
            if backend.active().is_superseded(&generation) {
                debug!(%key, %generation, "generation superseded, write-back dropped");
                return;
            }
            match backend.write(&generation, &key, snapshot).await {
                Ok(()) => debug!(%key, %generation, "response written back"),
                Err(BackendError::MissingGeneration(_)) => {
                    debug!(%key, %generation, "generation deleted, write-back dropped");
                }
                Err(err) => {
                    warn!(%key, %generation, error = %err, "write-back failed");
                    #[cfg(feature = "metrics")]
                    metrics::counter!(*WRITE_BACK_FAILED_COUNTER).increment(1);
                    events.emit(CacheEvent::WriteBackFailed {
                        generation,
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        });
    }
}
