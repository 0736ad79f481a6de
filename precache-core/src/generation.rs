//! Cache generation identifiers.
//!
//! A generation is a named, versioned bucket of cached entries. Changing the
//! generation identifier is the only supported way to invalidate precached
//! assets: a new identifier produces a fresh bucket and the old one is swept
//! once the new generation activates.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::manifest::ManifestError;

/// Name of a cache generation, e.g. `localdex-pwa-cache-v1`.
///
/// Identifiers are non-empty and contain no whitespace. Cloning is cheap:
/// short names are stored inline by [`SmolStr`].
///
/// # Example
///
/// ```
/// use precache_core::GenerationId;
///
/// let generation = GenerationId::new("app-cache-v2").unwrap();
/// assert_eq!(generation.as_str(), "app-cache-v2");
/// assert!(GenerationId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationId(SmolStr);

impl GenerationId {
    /// Creates a validated generation identifier.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ManifestError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(ManifestError::EmptyGeneration);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ManifestError::InvalidGeneration(name.to_owned()));
        }
        Ok(Self(SmolStr::new(name)))
    }

    /// Creates a generation identifier from a static string without validation.
    ///
    /// Intended for compile-time constants; the caller is responsible for
    /// passing a non-empty name without whitespace.
    #[inline]
    pub const fn new_static(name: &'static str) -> Self {
        Self(SmolStr::new_static(name))
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for GenerationId {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for GenerationId {
    type Error = ManifestError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GenerationId> for String {
    fn from(value: GenerationId) -> Self {
        value.0.to_string()
    }
}

impl AsRef<str> for GenerationId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}
