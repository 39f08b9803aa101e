use crate::domain::ManifestVersion;
use crate::error::{Result, VersionGateError};
use std::fmt;

/// Name of the tag that marks a released version (e.g. "v1.2.3")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName(String);

impl TagName {
    /// Derive the tag name as `prefix + version`
    pub fn for_version(prefix: &str, version: &ManifestVersion) -> Self {
        TagName(format!("{}{}", prefix, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full reference name in the tag namespace
    pub fn reference(&self) -> String {
        format!("refs/tags/{}", self.0)
    }

    /// Reject names git would refuse as a reference
    pub fn validate(&self) -> Result<()> {
        if git2::Reference::is_valid_name(&self.reference()) {
            Ok(())
        } else {
            Err(VersionGateError::tag_creation(format!(
                "'{}' is not a valid tag name",
                self.0
            )))
        }
    }

    /// Version part of an arbitrary tag carrying `prefix`, parsed as semver
    pub fn semver_of(tag: &str, prefix: &str) -> Option<semver::Version> {
        tag.strip_prefix(prefix)
            .and_then(|rest| semver::Version::parse(rest).ok())
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
