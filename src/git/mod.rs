//! Git operations abstraction layer
//!
//! The gate only needs the tag namespace: refresh it from the remote, look a tag
//! up by exact name, create one at HEAD, and push it. The [Repository] trait
//! covers exactly that so the decision logic can run against either:
//!
//! - [repository::Git2Repository]: a real repository opened with the `git2` crate
//! - [mock::MockRepository]: an in-memory repository with a shareable mock remote
//!
//! ```rust
//! # use version_gate::git::Repository;
//! # use version_gate::domain::{ManifestVersion, TagName};
//! # fn example<R: Repository>(repo: &R) -> version_gate::Result<()> {
//! let version = ManifestVersion::new("1.2.3")?;
//! let tag = TagName::for_version("v", &version);
//! repo.fetch_tags("origin")?;
//! if !repo.tag_exists(&tag)? {
//!     repo.create_tag(&tag, None)?;
//!     repo.push_tag("origin", &tag)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{MockRemote, MockRepository};
pub use repository::Git2Repository;

use crate::domain::TagName;
use crate::error::Result;
use std::path::PathBuf;

/// Result of pushing a tag to the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the new tag
    Pushed,
    /// The remote already had a tag with this name; nothing was changed
    AlreadyExists,
}

/// Tag namespace operations the gate depends on.
///
/// Implementations map their underlying errors to the taxonomy in
/// [crate::error::VersionGateError]: lookups and fetches fail with
/// `RepositoryAccessFailed`, local tag creation with `TagCreationFailed`,
/// and pushes with `PushRejected`.
pub trait Repository {
    /// Working directory of the checkout, if it has one
    fn workdir(&self) -> Option<PathBuf>;

    /// Refresh local tags from `remote` (`+refs/tags/*:refs/tags/*`)
    fn fetch_tags(&self, remote: &str) -> Result<()>;

    /// Whether `refs/tags/<tag>` exists. Exact match only.
    fn tag_exists(&self, tag: &TagName) -> Result<bool>;

    /// All tag names in the repository
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Create a tag at HEAD; annotated when `message` is given, lightweight otherwise
    fn create_tag(&self, tag: &TagName, message: Option<&str>) -> Result<()>;

    /// Delete a local tag; used to undo `create_tag` when its push fails
    fn delete_tag(&self, tag: &TagName) -> Result<()>;

    /// Push a single tag to `remote`.
    ///
    /// A rejection because the remote already has the tag is reported as
    /// [PushOutcome::AlreadyExists], not as an error.
    fn push_tag(&self, remote: &str, tag: &TagName) -> Result<PushOutcome>;
}
