//! Calling the network through an [`Upstream`] with an optional deadline.

use std::time::Duration;

use bytes::Bytes;
use http::Response;
use precache_core::Upstream;

use crate::error::FetchError;

/// Issues `request` and waits for the buffered response.
///
/// Without a `timeout` the fetch waits as long as the adapter does.
pub(crate) async fn fetch<U, Req, E>(
    upstream: &mut U,
    request: Req,
    timeout: Option<Duration>,
) -> Result<Response<Bytes>, FetchError<E>>
where
    U: Upstream<Req, Response = Result<Response<Bytes>, E>>,
{
    let call = upstream.call(request);
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(FetchError::Upstream),
            Err(_) => Err(FetchError::Timeout(limit)),
        },
        None => call.await.map_err(FetchError::Upstream),
    }
}
