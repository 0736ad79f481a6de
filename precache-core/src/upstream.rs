use std::future::Future;

/// Trait for calling the network with an intercepted request.
///
/// This trait is framework-agnostic: `precache-tower` implements it for
/// Tower services and `precache-reqwest` for the reqwest middleware chain and
/// for a bare `reqwest::Client`.
///
/// The cache layer expects `Response` to be a `Result` whose success value is
/// a fully buffered `http::Response<Bytes>`. Buffering is what allows a
/// network response to be duplicated: one copy goes back to the caller and
/// one is written into the current generation.
///
/// # Examples
///
/// ```rust,ignore
/// use precache_core::Upstream;
/// use std::future::Ready;
///
/// #[derive(Clone)]
/// struct StaticUpstream {
///     body: bytes::Bytes,
/// }
///
/// impl Upstream<http::Request<()>> for StaticUpstream {
///     type Response = Result<http::Response<bytes::Bytes>, std::io::Error>;
///     type Future = Ready<Self::Response>;
///
///     fn call(&mut self, _req: http::Request<()>) -> Self::Future {
///         std::future::ready(Ok(http::Response::new(self.body.clone())))
///     }
/// }
/// ```
pub trait Upstream<Req> {
    /// The response type returned by the network.
    type Response;

    /// The future that resolves to the response.
    type Future: Future<Output = Self::Response> + Send;

    /// Issue the request to the network.
    fn call(&mut self, req: Req) -> Self::Future;
}
