//! Store labels.

use std::fmt;

use smol_str::SmolStr;

/// Name of an entry store, attached to install spans and store metrics.
///
/// ```
/// use precache_core::BackendLabel;
///
/// let label = BackendLabel::new_static("moka");
/// assert_eq!(label.to_string(), "moka");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BackendLabel(SmolStr);

impl BackendLabel {
    /// Creates a label.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    /// Builds a label at compile time.
    pub const fn new_static(name: &'static str) -> Self {
        Self(SmolStr::new_static(name))
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BackendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendLabel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
