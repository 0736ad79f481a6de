//! Worker lifecycle.
//!
//! A [`CacheWorker`] owns one generation and walks it through
//!
//! ```text
//! Parsed ──install──► Installing ──ok──► Installed ──activate──► Activating ──► Activated
//!                         │                                                         │
//!                         └──failed──► Redundant ◄──────────superseded──────────────┘
//! ```
//!
//! Interception is only available once the worker is `Activated`, that is
//! after the generation was installed and obsolete generations were swept.
//! Activation promotes the generation in the store's [`ActiveGeneration`];
//! a worker whose generation is later replaced there becomes `Redundant`.
//! A successful install signals [`CacheEvent::ReadyToTakeOver`] straight
//! away; there is no waiting phase between install and activation.
//!
//! [`CacheEvent::ReadyToTakeOver`]: crate::CacheEvent::ReadyToTakeOver
//! [`ActiveGeneration`]: precache_backend::ActiveGeneration

use std::fmt::{self, Display};
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use precache_backend::Backend;
use precache_core::{GenerationId, Offload, Upstream};
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::cleanup::{Cleanup, SweepReport};
use crate::config::PrecacheConfig;
use crate::error::LifecycleError;
use crate::events::{CacheEvent, Events};
use crate::install::{InstallReport, Installer};
use crate::interceptor::Interceptor;
use crate::offload::OffloadManager;

/// Lifecycle state of a [`CacheWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Configured, nothing fetched yet.
    Parsed,
    /// Manifest resources are being fetched.
    Installing,
    /// The generation is complete and ready to take over.
    Installed,
    /// Obsolete generations are being swept.
    Activating,
    /// Intercepting requests.
    Activated,
    /// Install failed or a newer generation took over; this worker will
    /// never serve (again).
    Redundant,
}

impl WorkerState {
    /// Returns the state as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one generation from install to interception.
///
/// # Example
///
/// ```ignore
/// let config = PrecacheConfig::from_path("precache.yaml")?;
/// let worker = CacheWorker::new(config, MokaBackend::builder().build());
///
/// worker.install(network.clone()).await?;
/// worker.activate().await?;
/// let interceptor = worker.interceptor()?;
/// ```
pub struct CacheWorker<B, O = OffloadManager> {
    config: Arc<PrecacheConfig>,
    backend: Arc<B>,
    offload: O,
    events: Events,
    state: watch::Sender<WorkerState>,
}

impl<B, O> fmt::Debug for CacheWorker<B, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheWorker")
            .field("generation", &self.config.generation)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<B> CacheWorker<B, OffloadManager>
where
    B: Backend + 'static,
{
    /// Creates a worker for `config`, storing into `backend`.
    ///
    /// Write-backs run on an [`OffloadManager`] built from `config.offload`.
    pub fn new(config: PrecacheConfig, backend: B) -> Self {
        Self::with_shared_backend(config, Arc::new(backend))
    }

    /// Like [`new`](Self::new), for a store shared with other workers.
    pub fn with_shared_backend(config: PrecacheConfig, backend: Arc<B>) -> Self {
        let offload = OffloadManager::new(config.offload.clone());
        Self::with_offload(config, backend, offload)
    }
}

impl<B, O> CacheWorker<B, O>
where
    B: Backend + 'static,
    O: Offload,
{
    /// Creates a worker with a custom write-back executor.
    pub fn with_offload(config: PrecacheConfig, backend: Arc<B>, offload: O) -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            config: Arc::new(config),
            backend,
            offload,
            events: Events::default(),
            state,
        }
    }

    /// The generation this worker owns.
    pub fn generation(&self) -> &GenerationId {
        &self.config.generation
    }

    /// The worker configuration.
    pub fn config(&self) -> &PrecacheConfig {
        &self.config
    }

    /// The store the worker writes into.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Current lifecycle state.
    ///
    /// An `Activated` worker whose generation was replaced in the store
    /// reports `Redundant` from then on.
    pub fn state(&self) -> WorkerState {
        self.observe_supersession();
        *self.state.borrow()
    }

    /// Watches lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.observe_supersession();
        self.state.subscribe()
    }

    /// Receives lifecycle and failure events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn transition(
        &self,
        operation: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> Result<(), LifecycleError> {
        let mut actual = from;
        let changed = self.state.send_if_modified(|state| {
            actual = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            info!(generation = %self.config.generation, state = %to, "worker state changed");
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                operation,
                state: actual,
            })
        }
    }

    fn observe_supersession(&self) {
        let active = self.backend.active();
        if !active.is_superseded(&self.config.generation) {
            return;
        }
        let superseded = self.state.send_if_modified(|state| {
            if *state == WorkerState::Activated {
                *state = WorkerState::Redundant;
                true
            } else {
                false
            }
        });
        if superseded {
            info!(
                generation = %self.config.generation,
                active = ?active.get(),
                state = %WorkerState::Redundant,
                "worker superseded"
            );
        }
    }

    fn set_state(&self, to: WorkerState) {
        self.state.send_replace(to);
        info!(generation = %self.config.generation, state = %to, "worker state changed");
    }

    /// Installs the generation from the manifest.
    ///
    /// Only allowed from `Parsed`. On success the worker is `Installed`; on
    /// failure it becomes `Redundant` and any generation activated earlier
    /// keeps serving.
    pub async fn install<U, ReqBody, E>(&self, upstream: U) -> Result<InstallReport, LifecycleError>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>> + Clone,
        ReqBody: Default,
        E: Display,
    {
        self.transition("install", WorkerState::Parsed, WorkerState::Installing)?;
        let installer = Installer::new(self.backend.clone())
            .events(self.events.clone())
            .origin(self.config.origin.clone())
            .fetch_timeout(self.config.fetch_timeout);
        match installer
            .install(&self.config.generation, &self.config.manifest, upstream)
            .await
        {
            Ok(report) => {
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant);
                Err(err.into())
            }
        }
    }

    /// Sweeps obsolete generations and starts serving.
    ///
    /// Only allowed from `Installed`. If the store cannot even list its
    /// generations the worker stays `Installed` and activation can be
    /// retried. On success the generation is promoted in the store, which
    /// retires every worker and interceptor of an older generation.
    pub async fn activate(&self) -> Result<SweepReport, LifecycleError> {
        self.transition("activate", WorkerState::Installed, WorkerState::Activating)?;
        let cleanup = Cleanup::new(self.backend.clone()).events(self.events.clone());
        match cleanup.sweep(&self.config.generation).await {
            Ok(report) => {
                let generation = &self.config.generation;
                let previous = self.backend.active().promote(generation.clone());
                if let Some(previous) = previous.filter(|previous| previous != generation) {
                    info!(%generation, %previous, "generation superseded");
                }
                self.set_state(WorkerState::Activated);
                Ok(report)
            }
            Err(err) => {
                self.set_state(WorkerState::Installed);
                Err(err.into())
            }
        }
    }

    /// Installs and activates in one go.
    pub async fn start<U, ReqBody, E>(
        &self,
        upstream: U,
    ) -> Result<Interceptor<B, O>, LifecycleError>
    where
        U: Upstream<Request<ReqBody>, Response = Result<Response<Bytes>, E>> + Clone,
        ReqBody: Default,
        E: Display,
    {
        self.install(upstream).await?;
        self.activate().await?;
        self.interceptor()
    }

    /// Returns an interceptor serving this worker's generation.
    ///
    /// Only available once the worker is `Activated`.
    pub fn interceptor(&self) -> Result<Interceptor<B, O>, LifecycleError> {
        let state = self.state();
        if state != WorkerState::Activated {
            return Err(LifecycleError::InvalidState {
                operation: "intercept",
                state,
            });
        }
        Ok(Interceptor::with_offload(
            self.backend.clone(),
            self.config.generation.clone(),
            self.offload.clone(),
        )
        .events(self.events.clone())
        .fetch_timeout(self.config.fetch_timeout))
    }
}
