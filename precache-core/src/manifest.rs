//! Precache manifest types.
//!
//! This module provides the strongly typed form of the precache manifest:
//!
//! - [`ResourceId`] - A single validated request target
//! - [`Origin`] - Scheme and authority used to resolve origin-form targets
//! - [`Manifest`] - Ordered, non-empty, duplicate-free list of resources
//!
//! Malformed entries are rejected when the manifest is built or deserialized,
//! never at fetch time.
//!
//! ## Accepted targets
//!
//! - Origin-form paths: `/`, `/assets/favicon.png`, `/search?q=x`
//! - Absolute URLs with `http` or `https` scheme: `https://cdn.example.com/app.js`
//!
//! ```
//! use precache_core::{Manifest, ResourceId};
//!
//! let manifest = Manifest::new(["/", "/assets/favicon.png"]).unwrap();
//! assert_eq!(manifest.len(), 2);
//!
//! assert!(ResourceId::new("assets/relative.png").is_err());
//! assert!(ResourceId::new("ftp://example.com/file").is_err());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use http::Uri;
use http::uri::{Authority, PathAndQuery, Scheme};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Errors produced while validating manifest configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// The manifest has no entries.
    #[error("precache manifest must contain at least one resource")]
    EmptyManifest,
    /// The generation identifier is empty.
    #[error("generation identifier must not be empty")]
    EmptyGeneration,
    /// The generation identifier contains forbidden characters.
    #[error("invalid generation identifier {0:?}")]
    InvalidGeneration(String),
    /// A manifest entry is not a valid request target.
    #[error("invalid manifest resource {resource:?}: {reason}")]
    InvalidResource {
        /// The rejected entry as written.
        resource: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The same resource appears more than once.
    #[error("duplicate manifest resource {0:?}")]
    Duplicate(String),
    /// The origin is not a bare `scheme://authority`.
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The rejected origin as written.
        origin: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

fn invalid(resource: &str, reason: &'static str) -> ManifestError {
    ManifestError::InvalidResource {
        resource: resource.to_owned(),
        reason,
    }
}

fn is_web_scheme(scheme: &Scheme) -> bool {
    *scheme == Scheme::HTTP || *scheme == Scheme::HTTPS
}

/// A validated request target listed in the precache manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    raw: SmolStr,
    uri: Uri,
}

impl ResourceId {
    /// Parses and validates a request target.
    pub fn new(resource: impl AsRef<str>) -> Result<Self, ManifestError> {
        let raw = resource.as_ref();
        if raw.is_empty() {
            return Err(invalid(raw, "empty target"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid(raw, "contains whitespace"));
        }
        if raw.contains('#') {
            return Err(invalid(raw, "fragments are not part of a request target"));
        }
        let uri = Uri::from_str(raw).map_err(|_| invalid(raw, "not a valid URI"))?;
        match uri.scheme() {
            None if raw.starts_with('/') => {}
            None => return Err(invalid(raw, "relative targets must start with '/'")),
            Some(scheme) if is_web_scheme(scheme) => {
                if uri.authority().is_none() {
                    return Err(invalid(raw, "absolute targets need an authority"));
                }
            }
            Some(_) => return Err(invalid(raw, "only http and https are supported")),
        }
        Ok(Self {
            raw: SmolStr::new(raw),
            uri,
        })
    }

    /// Returns the target exactly as configured.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` for origin-form targets such as `/assets/app.js`.
    #[inline]
    pub fn is_origin_form(&self) -> bool {
        self.uri.scheme().is_none()
    }

    /// Returns the target as a URI, resolving origin-form targets against
    /// `origin` when one is given.
    pub fn resolve(&self, origin: Option<&Origin>) -> Uri {
        match origin {
            Some(origin) if self.is_origin_form() => origin.join(&self.uri),
            _ => self.uri.clone(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ResourceId {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.raw.to_string()
    }
}

/// Scheme and authority used to turn origin-form targets into absolute URLs.
///
/// Clients that issue absolute URLs (for example `reqwest`) need the manifest
/// resolved against the site origin so that precached entries are keyed the
/// same way as the requests they will later intercept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    scheme: Scheme,
    authority: Authority,
}

impl Origin {
    /// Parses an origin such as `https://example.com` or `http://127.0.0.1:8080`.
    pub fn new(origin: impl AsRef<str>) -> Result<Self, ManifestError> {
        let raw = origin.as_ref();
        let error = |reason| ManifestError::InvalidOrigin {
            origin: raw.to_owned(),
            reason,
        };
        let uri = Uri::from_str(raw).map_err(|_| error("not a valid URI"))?;
        let scheme = uri.scheme().cloned().ok_or_else(|| error("missing scheme"))?;
        if !is_web_scheme(&scheme) {
            return Err(error("only http and https are supported"));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| error("missing authority"))?;
        if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
            return Err(error("origin must not carry a path or query"));
        }
        Ok(Self { scheme, authority })
    }

    fn join(&self, target: &Uri) -> Uri {
        let path_and_query = target
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .unwrap_or_else(|_| target.clone())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

impl TryFrom<String> for Origin {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Origin> for String {
    fn from(value: Origin) -> Self {
        value.to_string()
    }
}

/// Ordered list of resources that must be present in a generation right after
/// it is installed.
///
/// A manifest is never empty and never lists the same target twice. Entries
/// keep their configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResourceId>", into = "Vec<ResourceId>")]
pub struct Manifest {
    resources: Vec<ResourceId>,
}

impl Manifest {
    /// Builds a manifest from raw targets, validating every entry.
    pub fn new<I, S>(resources: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resources = resources
            .into_iter()
            .map(ResourceId::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_resources(resources)
    }

    /// Builds a manifest from already validated resources.
    pub fn from_resources(resources: Vec<ResourceId>) -> Result<Self, ManifestError> {
        if resources.is_empty() {
            return Err(ManifestError::EmptyManifest);
        }
        let mut seen = HashSet::with_capacity(resources.len());
        for resource in &resources {
            if !seen.insert(resource.as_str()) {
                return Err(ManifestError::Duplicate(resource.as_str().to_owned()));
            }
        }
        Ok(Self { resources })
    }

    /// Returns an iterator over the resources in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.iter()
    }

    /// Number of resources in the manifest.
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Always `false`; kept for API symmetry with collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl TryFrom<Vec<ResourceId>> for Manifest {
    type Error = ManifestError;

    fn try_from(value: Vec<ResourceId>) -> Result<Self, Self::Error> {
        Self::from_resources(value)
    }
}

impl From<Manifest> for Vec<ResourceId> {
    fn from(value: Manifest) -> Self {
        value.resources
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ResourceId;
    type IntoIter = std::slice::Iter<'a, ResourceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_origin_form_targets() {
        for target in ["/", "/assets/favicon.png", "/search?q=pokemon"] {
            let resource = ResourceId::new(target).unwrap();
            assert!(resource.is_origin_form());
            assert_eq!(resource.resolve(None).to_string(), target);
        }
    }

    #[test]
    fn test_absolute_targets() {
        let resource = ResourceId::new("https://cdn.example.com/app.js").unwrap();
        assert!(!resource.is_origin_form());
        let origin = Origin::new("http://localhost:8080").unwrap();
        assert_eq!(
            resource.resolve(Some(&origin)).to_string(),
            "https://cdn.example.com/app.js"
        );
    }

    #[test]
    fn test_rejected_targets() {
        for target in [
            "",
            "assets/favicon.png",
            "/with space",
            "/page#section",
            "ftp://example.com/file",
        ] {
            assert!(
                matches!(
                    ResourceId::new(target),
                    Err(ManifestError::InvalidResource { .. })
                ),
                "{target:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_against_origin() {
        let origin = Origin::new("https://localdex.app").unwrap();
        let resource = ResourceId::new("/assets/manifest.json?v=3").unwrap();
        assert_eq!(
            resource.resolve(Some(&origin)).to_string(),
            "https://localdex.app/assets/manifest.json?v=3"
        );
    }

    #[test]
    fn test_origin_rejects_path() {
        assert!(Origin::new("https://localdex.app/").is_ok());
        assert!(matches!(
            Origin::new("https://localdex.app/assets"),
            Err(ManifestError::InvalidOrigin { .. })
        ));
        assert!(Origin::new("/assets").is_err());
    }

    #[test]
    fn test_manifest_keeps_order() {
        let manifest = Manifest::new(["/b", "/a", "/c"]).unwrap();
        let order: Vec<_> = manifest.iter().map(ResourceId::as_str).collect();
        assert_eq!(order, vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn test_manifest_rejects_empty_and_duplicates() {
        assert_eq!(
            Manifest::new(Vec::<&str>::new()),
            Err(ManifestError::EmptyManifest)
        );
        assert_eq!(
            Manifest::new(["/a", "/b", "/a"]),
            Err(ManifestError::Duplicate("/a".to_owned()))
        );
    }

    #[test]
    fn test_manifest_deserialize_validates() {
        let manifest: Manifest = serde_saphyr::from_str("- /\n- /assets/favicon.png\n").unwrap();
        assert_eq!(manifest.len(), 2);

        let rejected = serde_saphyr::from_str::<Manifest>("- /\n- not-a-path\n");
        assert!(rejected.is_err());
    }
}
