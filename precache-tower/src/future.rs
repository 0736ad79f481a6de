//! Response future for [`PrecacheService`](crate::PrecacheService).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Future, ready};
use http::header::HeaderName;
use http::{HeaderValue, Response};
use http_body_util::Full;
use pin_project::pin_project;
use precache::{FetchError, Resolution};

use crate::upstream::TowerError;

/// Future that turns a [`Resolution`] into the service response.
///
/// When a status header is configured it is set to `HIT`, `MISS` or
/// `BYPASS`. An unresolved request has no response to annotate and surfaces
/// as `Err`.
#[pin_project]
pub struct PrecacheServiceFuture<E> {
    #[pin]
    inner: BoxFuture<'static, Resolution<TowerError<E>>>,
    status_header: Option<HeaderName>,
}

impl<E> PrecacheServiceFuture<E> {
    pub(crate) fn new(
        inner: BoxFuture<'static, Resolution<TowerError<E>>>,
        status_header: Option<HeaderName>,
    ) -> Self {
        Self {
            inner,
            status_header,
        }
    }
}

impl<E> Future for PrecacheServiceFuture<E> {
    type Output = Result<Response<Full<Bytes>>, FetchError<TowerError<E>>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let resolution = ready!(this.inner.poll(cx));
        let status = resolution.status();
        let header = this.status_header.take();

        let response = resolution.into_result().map(|response| {
            let mut response = response.map(Full::new);
            if let Some(name) = header {
                response
                    .headers_mut()
                    .insert(name, HeaderValue::from_static(status.as_header_value()));
            }
            response
        });

        Poll::Ready(response)
    }
}
