use crate::error::{Result, VersionGateError};
use std::fmt;

/// Version string read from the manifest.
///
/// Only guarantees non-emptiness; comparison against tags is plain string
/// equality. Semver parsing is offered for warnings, never for gating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestVersion(String);

impl ManifestVersion {
    /// Accept a raw field value, rejecting empty or whitespace-only strings
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(VersionGateError::field_missing(
                "version field is empty".to_string(),
            ));
        }
        Ok(ManifestVersion(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a semantic version, if it is one
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
