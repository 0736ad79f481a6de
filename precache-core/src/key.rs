//! Request keys addressing entries inside a generation.
//!
//! A [`RequestKey`] is the method plus the request target exactly as issued.
//! Headers and body are not part of the key.
//!
//! ```
//! use http::Method;
//! use precache_core::RequestKey;
//!
//! let key = RequestKey::new(Method::GET, "/assets/favicon.png".parse().unwrap());
//! assert_eq!(key.to_string(), "GET /assets/favicon.png");
//! ```
//!
//! ## Performance
//!
//! [`RequestKey`] uses `Arc` internally, so cloning a key for a background
//! write-back only increments a reference count.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::{Method, Request, Uri};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RequestKeyInner {
    method: Method,
    target: SmolStr,
}

/// Key of a cached entry: request method and target.
#[derive(Clone, Debug)]
pub struct RequestKey {
    inner: Arc<RequestKeyInner>,
}

impl PartialEq for RequestKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for RequestKey {}

impl Hash for RequestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl RequestKey {
    /// Creates a key from a method and a request target.
    pub fn new(method: Method, target: Uri) -> Self {
        RequestKey {
            inner: Arc::new(RequestKeyInner {
                method,
                target: SmolStr::new(target.to_string()),
            }),
        }
    }

    /// Creates a `GET` key for the given target.
    pub fn get(target: Uri) -> Self {
        Self::new(Method::GET, target)
    }

    /// Builds the key of an intercepted request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri().clone())
    }

    /// Returns the request method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Returns the request target as issued.
    #[inline]
    pub fn target(&self) -> &str {
        &self.inner.target
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.method, self.inner.target)
    }
}
