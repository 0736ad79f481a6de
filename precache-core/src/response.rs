//! Point-in-time response snapshots stored in a generation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, Response, StatusCode, Version};

/// A stored response: status, version, headers and a fully buffered body.
///
/// Snapshots are immutable once stored. Writing a new snapshot under the same
/// key replaces the previous one. Cloning is cheap because the body is
/// reference counted, which is what lets the interceptor hand one copy to the
/// caller and another to the background write-back.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::{Response, StatusCode};
/// use precache_core::CachedResponse;
///
/// let response = Response::builder()
///     .status(StatusCode::OK)
///     .header("content-type", "text/plain")
///     .body(Bytes::from_static(b"X"))
///     .unwrap();
///
/// let snapshot = CachedResponse::from_response(response);
/// assert_eq!(snapshot.status(), StatusCode::OK);
/// assert_eq!(snapshot.body(), &Bytes::from_static(b"X"));
///
/// let replayed = snapshot.into_response();
/// assert_eq!(replayed.headers()["content-type"], "text/plain");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Snapshots a buffered response.
    pub fn from_response(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        CachedResponse {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body,
            stored_at: Utc::now(),
        }
    }

    /// Rebuilds an HTTP response from the snapshot.
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response
    }

    /// Returns the response status.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the HTTP version the response was received with.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the stored headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the stored body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns when the snapshot was taken.
    #[inline]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Returns the estimated memory usage of this snapshot in bytes.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        std::mem::size_of::<Self>() + headers + self.body.len()
    }
}
