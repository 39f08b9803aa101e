use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Unified error type for version-gate operations
#[derive(Error, Debug)]
pub enum VersionGateError {
    #[error("Manifest unreadable: {0}")]
    ManifestUnreadable(String),

    #[error("Version field missing: {0}")]
    FieldMissing(String),

    #[error("Repository access failed: {0}")]
    RepositoryAccessFailed(String),

    #[error("Tag creation failed: {0}")]
    TagCreationFailed(String),

    #[error("Push rejected for '{tag}': {reason}")]
    PushRejected { tag: String, reason: String },

    #[error("Release service unavailable: {0}")]
    ReleaseServiceUnavailable(String),

    #[error("Release already exists for tag '{0}'")]
    DuplicateRelease(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in version-gate
pub type Result<T> = std::result::Result<T, VersionGateError>;

impl VersionGateError {
    pub fn manifest_unreadable(msg: impl Into<String>) -> Self {
        VersionGateError::ManifestUnreadable(msg.into())
    }

    pub fn field_missing(msg: impl Into<String>) -> Self {
        VersionGateError::FieldMissing(msg.into())
    }

    pub fn repository(msg: impl Into<String>) -> Self {
        VersionGateError::RepositoryAccessFailed(msg.into())
    }

    pub fn tag_creation(msg: impl Into<String>) -> Self {
        VersionGateError::TagCreationFailed(msg.into())
    }

    pub fn push_rejected(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        VersionGateError::PushRejected {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    pub fn release_unavailable(msg: impl Into<String>) -> Self {
        VersionGateError::ReleaseServiceUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        VersionGateError::Config(msg.into())
    }

    /// Whether this error means the work was already done by someone else.
    ///
    /// A duplicate release is always benign. A push rejection is benign only
    /// when the remote refused because the tag already exists there.
    pub fn is_benign(&self) -> bool {
        match self {
            VersionGateError::DuplicateRelease(_) => true,
            VersionGateError::PushRejected { reason, .. } => is_already_exists_reason(reason),
            _ => false,
        }
    }
}

/// Matches the rejection texts git servers and libgit2 use when a ref is
/// already present on the remote.
pub(crate) fn is_already_exists_reason(reason: &str) -> bool {
    static ALREADY_EXISTS: OnceLock<Regex> = OnceLock::new();
    ALREADY_EXISTS
        .get_or_init(|| {
            Regex::new(
                r"(?i)already exists|non-fast-?forward|fetch first|not present locally|\bstale\b",
            )
            .expect("already-exists pattern is a valid regex")
        })
        .is_match(reason)
}
