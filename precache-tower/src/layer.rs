//! Tower layer constructing [`PrecacheService`].

use http::header::HeaderName;
use precache::Interceptor;
use precache::offload::OffloadManager;
use tower::Layer;

use crate::service::PrecacheService;

/// Default name of the cache status header.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Tower [`Layer`] that serves `GET` requests from the current generation.
///
/// Built from the interceptor of an activated
/// [`CacheWorker`](precache::CacheWorker). The cache status header is off by
/// default; enable it with [`with_status_header`](Self::with_status_header).
pub struct PrecacheLayer<B, O = OffloadManager> {
    interceptor: Interceptor<B, O>,
    status_header: Option<HeaderName>,
}

impl<B, O> PrecacheLayer<B, O> {
    /// Creates a layer resolving requests through `interceptor`.
    pub fn new(interceptor: Interceptor<B, O>) -> Self {
        Self {
            interceptor,
            status_header: None,
        }
    }

    /// Adds `X-Cache-Status: HIT | MISS | BYPASS` to every response.
    pub fn with_status_header(self) -> Self {
        self.status_header(CACHE_STATUS_HEADER)
    }

    /// Adds the cache status under a custom header name.
    pub fn status_header(self, name: HeaderName) -> Self {
        Self {
            status_header: Some(name),
            ..self
        }
    }
}

impl<B, O: Clone> Clone for PrecacheLayer<B, O> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<S, B, O: Clone> Layer<S> for PrecacheLayer<B, O> {
    type Service = PrecacheService<S, B, O>;

    fn layer(&self, inner: S) -> Self::Service {
        PrecacheService::new(inner, self.interceptor.clone(), self.status_header.clone())
    }
}
