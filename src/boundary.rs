use std::fmt;

/// Non-fatal conditions met while gating a release.
/// These never change the decision but should be reported to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Manifest version is not a semantic version; it is still used verbatim
    NonSemverVersion { version: String },
    /// Manifest version sorts below an existing tag; the release still proceeds
    VersionNotAhead { version: String, highest_tag: String },
    /// Another invocation pushed the same tag first
    TagPushedConcurrently { tag: String },
    /// The hosting service already had a release for the tag
    ReleaseAlreadyExists { tag: String },
    /// Tag exists but its release is missing; a plain run cannot repair it
    ReleaseMissingForTag { tag: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NonSemverVersion { version } => {
                write!(
                    f,
                    "Manifest version '{}' is not a semantic version; using it as-is",
                    version
                )
            }
            BoundaryWarning::VersionNotAhead {
                version,
                highest_tag,
            } => {
                write!(
                    f,
                    "Manifest version '{}' is lower than existing tag '{}'; releasing anyway",
                    version, highest_tag
                )
            }
            BoundaryWarning::TagPushedConcurrently { tag } => {
                write!(
                    f,
                    "Tag '{}' was pushed by a concurrent run; leaving the release to it",
                    tag
                )
            }
            BoundaryWarning::ReleaseAlreadyExists { tag } => {
                write!(f, "A release for tag '{}' already exists", tag)
            }
            BoundaryWarning::ReleaseMissingForTag { tag } => {
                write!(
                    f,
                    "Tag '{}' exists but has no release; rerun with --repair-release to create it",
                    tag
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_ahead_display() {
        let warning = BoundaryWarning::VersionNotAhead {
            version: "1.9.0".to_string(),
            highest_tag: "v2.0.0".to_string(),
        };
        let msg = warning.to_string();
        assert!(msg.contains("1.9.0"));
        assert!(msg.contains("v2.0.0"));
    }

    #[test]
    fn test_release_missing_mentions_repair_flag() {
        let warning = BoundaryWarning::ReleaseMissingForTag {
            tag: "v1.0.0".to_string(),
        };
        assert!(warning.to_string().contains("--repair-release"));
    }
}
