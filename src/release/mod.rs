//! Release service abstraction
//!
//! The hosting service is treated as an append-only store of releases reached
//! through two narrow calls: look one up by tag, create one. Implementations:
//!
//! - [github::GitHubReleases]: GitHub REST API over a blocking HTTP client
//! - [mock::MockReleaseService]: in-memory store with call tracking

pub mod github;
pub mod mock;

pub use github::GitHubReleases;
pub use mock::MockReleaseService;

use crate::domain::TagName;
use crate::error::Result;

/// Release to create for a freshly pushed tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub tag: TagName,
    /// Release title
    pub name: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl ReleaseRequest {
    /// Request titled after the tag itself
    pub fn for_tag(tag: TagName) -> Self {
        ReleaseRequest {
            name: tag.to_string(),
            tag,
            draft: false,
            prerelease: false,
        }
    }
}

/// Release as reported back by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub html_url: Option<String>,
}

/// Hosting-service release operations.
///
/// `create_release` asks the service to generate the notes itself from the
/// history since the previous tag. It fails with `DuplicateRelease` when a
/// release for the tag already exists, and with `ReleaseServiceUnavailable`
/// for everything else.
pub trait ReleaseService {
    /// Whether a release already points at `tag`, drafts included
    fn release_exists(&self, tag: &TagName) -> Result<bool>;

    fn create_release(&self, request: &ReleaseRequest) -> Result<Release>;
}
