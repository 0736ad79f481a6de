//! Cache middleware for reqwest-middleware.

use async_trait::async_trait;
use http::Extensions;
use http::header::{HeaderName, HeaderValue};
use precache::offload::OffloadManager;
use precache::{FetchError, Interceptor};
use precache_backend::Backend;
use precache_core::Offload;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::debug;

use crate::upstream::ReqwestUpstream;

/// Default name of the cache status header.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Middleware answering `GET` requests from the current generation.
///
/// Built from the interceptor of an activated
/// [`CacheWorker`](precache::CacheWorker). Misses continue down the
/// middleware chain and the response is written back in the background.
///
/// # Example
///
/// ```ignore
/// use precache_reqwest::{ClientUpstream, PrecacheMiddleware};
/// use reqwest_middleware::ClientBuilder;
///
/// worker.install(ClientUpstream::new(reqwest::Client::new())).await?;
/// worker.activate().await?;
///
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(PrecacheMiddleware::new(worker.interceptor()?))
///     .build();
/// ```
pub struct PrecacheMiddleware<B, O = OffloadManager> {
    interceptor: Interceptor<B, O>,
    status_header: Option<HeaderName>,
}

impl<B, O> PrecacheMiddleware<B, O> {
    /// Creates a middleware resolving requests through `interceptor`.
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

impl<B, O: Clone> Clone for PrecacheMiddleware<B, O> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

#[async_trait]
impl<B, O> Middleware for PrecacheMiddleware<B, O>
where
    B: Backend + 'static,
    O: Offload + 'static,
{
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let request: http::Request<reqwest::Body> = req
            .try_into()
            .map_err(reqwest_middleware::Error::Reqwest)?;

        let upstream = ReqwestUpstream::new(next, extensions.clone());
        let resolution = self.interceptor.intercept(request, upstream).await;
        let status = resolution.status();
        debug!(status = status.as_str(), "request resolved");

        let mut response = resolution.into_result().map_err(|error| match error {
            FetchError::Upstream(error) => error,
            timeout => reqwest_middleware::Error::middleware(timeout),
        })?;

        if let Some(name) = &self.status_header {
            response
                .headers_mut()
                .insert(name.clone(), HeaderValue::from_static(status.as_header_value()));
        }

        Ok(response.into())
    }
}
