//! Upstream adapter for bridging Tower services to precache.
//!
//! [`TowerUpstream`] calls the wrapped service and buffers the response body
//! so that the interceptor can keep a copy. It is used internally by
//! [`PrecacheService`](crate::PrecacheService) and is also what you hand to
//! [`CacheWorker::install`](precache::CacheWorker::install) to fetch the
//! manifest through the same service.

use std::marker::PhantomData;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::BodyExt;
use hyper::body::Body as HttpBody;
use precache_core::Upstream;
use tower::{BoxError, Service, ServiceExt};

/// Failure of the wrapped service, including failing to read its body.
#[derive(Debug, thiserror::Error)]
pub enum TowerError<E> {
    /// The service returned an error.
    #[error("service error: {0}")]
    Service(E),
    /// The response body could not be buffered.
    #[error("failed to buffer response body: {0}")]
    Body(#[source] BoxError),
}

/// Adapter implementing [`Upstream`] for a Tower service.
pub struct TowerUpstream<S, ResBody> {
    service: S,
    _body: PhantomData<fn() -> ResBody>,
}

impl<S, ResBody> TowerUpstream<S, ResBody> {
    /// Wraps `service`.
    pub fn new(service: S) -> Self {
        Self {
            service,
            _body: PhantomData,
        }
    }
}

impl<S: Clone, ResBody> Clone for TowerUpstream<S, ResBody> {
    fn clone(&self) -> Self {
        Self::new(self.service.clone())
    }
}

impl<S, ReqBody, ResBody> Upstream<Request<ReqBody>> for TowerUpstream<S, ResBody>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Result<Response<Bytes>, TowerError<S::Error>>;
    type Future = BoxFuture<'static, Self::Response>;

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let service = self.service.clone();
        Box::pin(async move {
            let response = service.oneshot(req).await.map_err(TowerError::Service)?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|error| TowerError::Body(error.into()))?
                .to_bytes();
            Ok(Response::from_parts(parts, body))
        })
    }
}
