//! Domain values - the version read from the manifest and the tag derived from it

pub mod tag;
pub mod version;

pub use tag::TagName;
pub use version::ManifestVersion;
