//! Worker configuration.
//!
//! A configuration names the generation to install, the manifest to warm it
//! with and a few knobs for the network side. It is usually loaded from YAML:
//!
//! ```yaml
//! generation: localdex-pwa-cache-v1
//! origin: https://localdex.example
//! fetch_timeout: 10s
//! manifest:
//!   - /
//!   - /assets/favicon.png
//!   - /assets/manifest.json
//! offload:
//!   timeout_policy:
//!     warn: 2s
//! ```
//!
//! Validation happens while loading: an empty manifest, a duplicate entry or
//! a malformed generation identifier is rejected before any worker exists.

use std::path::Path;
use std::time::Duration;

use precache_core::{GenerationId, Manifest, Origin};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::offload::OffloadConfig;

/// Configuration of one worker and the generation it installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrecacheConfig {
    /// Identifier of the generation this worker installs.
    pub generation: GenerationId,
    /// Resources that must be present once the generation is installed.
    pub manifest: Manifest,
    /// Origin used to resolve origin-form manifest entries into absolute
    /// URLs. Leave unset when intercepted requests carry origin-form targets.
    #[serde(default)]
    pub origin: Option<Origin>,
    /// Deadline for every network fetch (e.g. "10s", "500ms"). Unset means
    /// no deadline.
    #[serde(default, with = "humantime_serde")]
    pub fetch_timeout: Option<Duration>,
    /// Policy for background write-back tasks.
    #[serde(default)]
    pub offload: OffloadConfig,
}

impl PrecacheConfig {
    /// Starts a programmatic configuration.
    pub fn builder() -> PrecacheConfigBuilder {
        PrecacheConfigBuilder::default()
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Reads and validates a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

/// Builder for [`PrecacheConfig`].
#[derive(Debug, Default)]
pub struct PrecacheConfigBuilder {
    generation: Option<String>,
    manifest: Vec<String>,
    origin: Option<String>,
    fetch_timeout: Option<Duration>,
    offload: OffloadConfig,
}

impl PrecacheConfigBuilder {
    /// Sets the generation identifier.
    pub fn generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }

    /// Appends manifest entries.
    pub fn manifest<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Sets the origin used to resolve origin-form entries.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Bounds every network fetch.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the write-back task policy.
    pub fn offload(mut self, offload: OffloadConfig) -> Self {
        self.offload = offload;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<PrecacheConfig, ConfigError> {
        let generation = self.generation.ok_or(ConfigError::Missing("generation"))?;
        Ok(PrecacheConfig {
            generation: GenerationId::new(generation)?,
            manifest: Manifest::new(self.manifest)?,
            origin: self.origin.map(Origin::new).transpose()?,
            fetch_timeout: self.fetch_timeout,
            offload: self.offload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::TimeoutPolicy;
    use pretty_assertions::assert_eq;
    use precache_core::ManifestError;

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
generation: localdex-pwa-cache-v1
origin: https://localdex.example
fetch_timeout: 10s
manifest:
  - /
  - /assets/favicon.png
offload:
  timeout_policy:
    warn: 2s
"#;
        let config = PrecacheConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.generation.as_str(), "localdex-pwa-cache-v1");
        assert_eq!(config.manifest.len(), 2);
        assert_eq!(
            config.origin.unwrap().to_string(),
            "https://localdex.example"
        );
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            config.offload.timeout_policy,
            TimeoutPolicy::Warn(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_defaults() {
        let config = PrecacheConfig::from_yaml("generation: v1\nmanifest: [/a]\n").unwrap();
        assert_eq!(config.origin, None);
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.offload.timeout_policy, TimeoutPolicy::None);
    }

    #[test]
    fn test_rejects_malformed_configuration() {
        for yaml in [
            "generation: v1\nmanifest: []\n",
            "generation: v1\nmanifest: [/a, /a]\n",
            "generation: ''\nmanifest: [/a]\n",
            "generation: v1\nmanifest: [relative.png]\n",
            "generation: v1\nmanifest: [/a]\nunknown: true\n",
        ] {
            assert!(
                matches!(PrecacheConfig::from_yaml(yaml), Err(ConfigError::Parse(_))),
                "accepted {yaml:?}"
            );
        }
    }

    #[test]
    fn test_builder() {
        let config = PrecacheConfig::builder()
            .generation("v2")
            .manifest(["/a", "/b"])
            .manifest(["/c"])
            .fetch_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        assert_eq!(config.manifest.len(), 3);
        assert_eq!(config.fetch_timeout, Some(Duration::from_millis(500)));

        let missing = PrecacheConfig::builder().manifest(["/a"]).build();
        assert!(matches!(missing, Err(ConfigError::Missing("generation"))));

        let empty = PrecacheConfig::builder().generation("v2").build();
        assert!(matches!(
            empty,
            Err(ConfigError::Manifest(ManifestError::EmptyManifest))
        ));
    }
}
