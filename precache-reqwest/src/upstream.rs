//! Upstream adapters for reqwest.
//!
//! - [`ReqwestUpstream`] continues the middleware chain; used internally by
//!   [`PrecacheMiddleware`](crate::PrecacheMiddleware)
//! - [`ClientUpstream`] sends requests with a bare [`reqwest::Client`], which
//!   is what installation uses before any middleware exists
//!
//! Both buffer the response body so the interceptor can keep a copy.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::Extensions;
use http_body_util::BodyExt;
use precache_core::Upstream;
use reqwest_middleware::Next;

/// Converts a reqwest response into a buffered `http` response.
pub(crate) async fn buffer(response: reqwest::Response) -> Result<http::Response<Bytes>, reqwest::Error> {
    let response: http::Response<reqwest::Body> = response.into();
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(http::Response::from_parts(parts, body))
}

/// Adapter that runs the rest of the middleware chain.
pub struct ReqwestUpstream<'a> {
    next: Next<'a>,
    extensions: Extensions,
}

impl<'a> ReqwestUpstream<'a> {
    /// Creates an upstream continuing with `next`.
    pub fn new(next: Next<'a>, extensions: Extensions) -> Self {
        Self { next, extensions }
    }
}

impl<'a> Upstream<http::Request<reqwest::Body>> for ReqwestUpstream<'a> {
    type Response = reqwest_middleware::Result<http::Response<Bytes>>;
    type Future = Pin<Box<dyn Future<Output = Self::Response> + Send + 'a>>;

    fn call(&mut self, req: http::Request<reqwest::Body>) -> Self::Future {
        let next = self.next.clone();
        let mut extensions = std::mem::take(&mut self.extensions);

        Box::pin(async move {
            let request: reqwest::Request = req.try_into().map_err(reqwest_middleware::Error::Reqwest)?;
            let response = next.run(request, &mut extensions).await?;
            buffer(response)
                .await
                .map_err(reqwest_middleware::Error::Reqwest)
        })
    }
}

/// Adapter sending requests with a plain [`reqwest::Client`].
///
/// Requests must carry absolute URLs. Set an `origin` in the precache
/// configuration when the manifest lists origin-form paths.
#[derive(Debug, Clone, Default)]
pub struct ClientUpstream {
    client: reqwest::Client,
}

impl ClientUpstream {
    /// Wraps `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Upstream<http::Request<Bytes>> for ClientUpstream {
    type Response = Result<http::Response<Bytes>, reqwest::Error>;
    type Future = Pin<Box<dyn Future<Output = Self::Response> + Send + 'static>>;

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let request = reqwest::Request::try_from(req)?;
            let response = client.execute(request).await?;
            buffer(response).await
        })
    }
}
