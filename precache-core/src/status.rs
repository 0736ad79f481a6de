//! Per-request cache status.

/// How an intercepted request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the current generation without network activity.
    Hit,
    /// Not cached; fetched from the network and written back.
    Miss,
    /// Not eligible for caching (non-`GET`); forwarded untouched.
    Bypass,
    /// Not cached and the network produced no response.
    Unresolved,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
            CacheStatus::Unresolved => "unresolved",
        }
    }

    /// Returns the status in the upper-case form used for response headers.
    #[inline]
    pub const fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
            CacheStatus::Unresolved => "UNRESOLVED",
        }
    }
}
