//! Tower service that answers requests from the current generation.

use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::HeaderName;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Body as HttpBody;
use precache::offload::OffloadManager;
use precache::{FetchError, Interceptor};
use precache_backend::Backend;
use precache_core::Offload;
use tower::{BoxError, Service};

use crate::future::PrecacheServiceFuture;
use crate::upstream::{TowerError, TowerUpstream};

/// Service produced by [`PrecacheLayer`](crate::PrecacheLayer).
///
/// `GET` requests are answered from the current generation when possible;
/// everything else reaches the wrapped service untouched. Response bodies
/// are always buffered.
pub struct PrecacheService<S, B, O = OffloadManager> {
    inner: S,
    interceptor: Interceptor<B, O>,
    status_header: Option<HeaderName>,
}

impl<S, B, O> PrecacheService<S, B, O> {
    /// Wraps `inner`, resolving requests through `interceptor`.
    pub fn new(
        inner: S,
        interceptor: Interceptor<B, O>,
        status_header: Option<HeaderName>,
    ) -> Self {
        Self {
            inner,
            interceptor,
            status_header,
        }
    }
}

impl<S, B, O> Clone for PrecacheService<S, B, O>
where
    S: Clone,
    O: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            interceptor: self.interceptor.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<S, B, O, ReqBody, ResBody> Service<Request<ReqBody>> for PrecacheService<S, B, O>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Backend + 'static,
    O: Offload + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = FetchError<TowerError<S::Error>>;
    type Future = PrecacheServiceFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|error| FetchError::Upstream(TowerError::Service(error)))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Keep the instance that was driven to readiness for this request.
        let clone = self.inner.clone();
        let ready = std::mem::replace(&mut self.inner, clone);
        let upstream = TowerUpstream::<S, ResBody>::new(ready);
        let interceptor = self.interceptor.clone();

        PrecacheServiceFuture::new(
            Box::pin(async move { interceptor.intercept(req, upstream).await }),
            self.status_header.clone(),
        )
    }
}

impl<S, B, O> std::fmt::Debug for PrecacheService<S, B, O>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecacheService")
            .field("inner", &self.inner)
            .field("interceptor", &self.interceptor)
            .field("status_header", &self.status_header)
            .finish()
    }
}
