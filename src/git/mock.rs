use crate::domain::TagName;
use crate::error::{Result, VersionGateError};
use crate::git::{PushOutcome, Repository};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Barrier, Mutex};

/// In-memory remote shared between mock clones.
///
/// Pushing a tag is atomic: the first push of a name wins, later pushes see
/// [PushOutcome::AlreadyExists].
#[derive(Debug, Default)]
pub struct MockRemote {
    tags: Mutex<BTreeSet<String>>,
    accepted_pushes: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote::default())
    }

    /// Seed a tag that was pushed by someone else
    pub fn add_tag(&self, name: impl Into<String>) {
        lock(&self.tags).insert(name.into());
    }

    pub fn tags(&self) -> Vec<String> {
        lock(&self.tags).iter().cloned().collect()
    }

    /// Tags whose push was accepted, in order
    pub fn accepted_pushes(&self) -> Vec<String> {
        lock(&self.accepted_pushes).clone()
    }

    fn accept(&self, name: &str) -> PushOutcome {
        let mut tags = lock(&self.tags);
        if tags.insert(name.to_string()) {
            lock(&self.accepted_pushes).push(name.to_string());
            PushOutcome::Pushed
        } else {
            PushOutcome::AlreadyExists
        }
    }
}

/// Mock repository for testing without actual git operations
///
/// Local tags are only refreshed from the shared [MockRemote] by `fetch_tags`,
/// so two mock clones can hold stale views of the remote the way two CI
/// checkouts do.
pub struct MockRepository {
    workdir: Option<PathBuf>,
    remote: Arc<MockRemote>,
    local_tags: Mutex<BTreeSet<String>>,
    // Call tracking
    fetch_calls: Mutex<Vec<String>>,
    created_tags: Mutex<Vec<(String, Option<String>)>>,
    push_calls: Mutex<Vec<String>>,
    deleted_tags: Mutex<Vec<String>>,
    // Error injection
    error_on_fetch: Mutex<Option<String>>,
    error_on_create: Mutex<Option<String>>,
    error_on_push: Mutex<Option<String>>,
    create_barrier: Option<Arc<Barrier>>,
}

impl MockRepository {
    /// Create a new mock repository with its own empty remote
    pub fn new() -> Self {
        Self::with_remote(MockRemote::new())
    }

    /// Create a mock clone of `remote`
    pub fn with_remote(remote: Arc<MockRemote>) -> Self {
        MockRepository {
            workdir: None,
            remote,
            local_tags: Mutex::new(BTreeSet::new()),
            fetch_calls: Mutex::new(Vec::new()),
            created_tags: Mutex::new(Vec::new()),
            push_calls: Mutex::new(Vec::new()),
            deleted_tags: Mutex::new(Vec::new()),
            error_on_fetch: Mutex::new(None),
            error_on_create: Mutex::new(None),
            error_on_push: Mutex::new(None),
            create_barrier: None,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Block in `create_tag` until every party of `barrier` got there.
    ///
    /// Lets tests hold concurrent invocations between the existence check and the push.
    pub fn with_create_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.create_barrier = Some(barrier);
        self
    }

    /// Add a tag to the local view only
    pub fn add_local_tag(&self, name: impl Into<String>) {
        lock(&self.local_tags).insert(name.into());
    }

    pub fn remote(&self) -> &Arc<MockRemote> {
        &self.remote
    }

    pub fn fail_fetch(&self, message: impl Into<String>) {
        *lock(&self.error_on_fetch) = Some(message.into());
    }

    pub fn fail_create(&self, message: impl Into<String>) {
        *lock(&self.error_on_create) = Some(message.into());
    }

    pub fn fail_push(&self, message: impl Into<String>) {
        *lock(&self.error_on_push) = Some(message.into());
    }

    pub fn clear_push_failure(&self) {
        *lock(&self.error_on_push) = None;
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        lock(&self.fetch_calls).clone()
    }

    /// Tags created locally, with their annotation message
    pub fn created_tags(&self) -> Vec<(String, Option<String>)> {
        lock(&self.created_tags).clone()
    }

    pub fn push_calls(&self) -> Vec<String> {
        lock(&self.push_calls).clone()
    }

    pub fn deleted_tags(&self) -> Vec<String> {
        lock(&self.deleted_tags).clone()
    }

    /// Whether any mutating call was made
    pub fn is_untouched(&self) -> bool {
        self.created_tags().is_empty() && self.push_calls().is_empty()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> Option<PathBuf> {
        self.workdir.clone()
    }

    fn fetch_tags(&self, remote: &str) -> Result<()> {
        lock(&self.fetch_calls).push(remote.to_string());
        if let Some(message) = lock(&self.error_on_fetch).clone() {
            return Err(VersionGateError::repository(message));
        }

        let remote_tags = self.remote.tags();
        lock(&self.local_tags).extend(remote_tags);
        Ok(())
    }

    fn tag_exists(&self, tag: &TagName) -> Result<bool> {
        Ok(lock(&self.local_tags).contains(tag.as_str()))
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(lock(&self.local_tags).iter().cloned().collect())
    }

    fn create_tag(&self, tag: &TagName, message: Option<&str>) -> Result<()> {
        if let Some(barrier) = &self.create_barrier {
            barrier.wait();
        }
        if let Some(message) = lock(&self.error_on_create).clone() {
            return Err(VersionGateError::tag_creation(message));
        }
        tag.validate()?;

        if !lock(&self.local_tags).insert(tag.to_string()) {
            return Err(VersionGateError::tag_creation(format!(
                "tag '{}' already exists",
                tag
            )));
        }
        lock(&self.created_tags).push((tag.to_string(), message.map(str::to_string)));
        Ok(())
    }

    fn delete_tag(&self, tag: &TagName) -> Result<()> {
        if !lock(&self.local_tags).remove(tag.as_str()) {
            return Err(VersionGateError::repository(format!(
                "tag '{}' not found",
                tag
            )));
        }
        lock(&self.deleted_tags).push(tag.to_string());
        Ok(())
    }

    fn push_tag(&self, _remote: &str, tag: &TagName) -> Result<PushOutcome> {
        lock(&self.push_calls).push(tag.to_string());
        if let Some(reason) = lock(&self.error_on_push).clone() {
            return Err(VersionGateError::push_rejected(tag.as_str(), reason));
        }
        if !lock(&self.local_tags).contains(tag.as_str()) {
            return Err(VersionGateError::push_rejected(
                tag.as_str(),
                "src refspec does not match any",
            ));
        }

        Ok(self.remote.accept(tag.as_str()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManifestVersion;

    fn tag(raw: &str) -> TagName {
        TagName::for_version("v", &ManifestVersion::new(raw).unwrap())
    }

    #[test]
    fn test_mock_fetch_copies_remote_tags() {
        let repo = MockRepository::new();
        repo.remote().add_tag("v1.0.0");

        assert!(!repo.tag_exists(&tag("1.0.0")).unwrap());
        repo.fetch_tags("origin").unwrap();
        assert!(repo.tag_exists(&tag("1.0.0")).unwrap());
        assert_eq!(repo.fetch_calls(), vec!["origin".to_string()]);
    }

    #[test]
    fn test_mock_push_is_first_writer_wins() {
        let remote = MockRemote::new();
        let a = MockRepository::with_remote(Arc::clone(&remote));
        let b = MockRepository::with_remote(Arc::clone(&remote));

        a.create_tag(&tag("3.0.0"), None).unwrap();
        b.create_tag(&tag("3.0.0"), None).unwrap();

        assert_eq!(a.push_tag("origin", &tag("3.0.0")).unwrap(), PushOutcome::Pushed);
        assert_eq!(
            b.push_tag("origin", &tag("3.0.0")).unwrap(),
            PushOutcome::AlreadyExists
        );
        assert_eq!(remote.accepted_pushes(), vec!["v3.0.0".to_string()]);
    }

    #[test]
    fn test_mock_error_injection() {
        let repo = MockRepository::new();
        repo.fail_fetch("network unreachable");
        assert!(matches!(
            repo.fetch_tags("origin"),
            Err(VersionGateError::RepositoryAccessFailed(_))
        ));

        repo.fail_create("disk full");
        assert!(matches!(
            repo.create_tag(&tag("1.0.0"), None),
            Err(VersionGateError::TagCreationFailed(_))
        ));
    }

    #[test]
    fn test_mock_push_without_local_tag_is_rejected() {
        let repo = MockRepository::new();
        let err = repo.push_tag("origin", &tag("1.0.0")).unwrap_err();
        assert!(!err.is_benign());
    }

    #[test]
    fn test_mock_repository_default() {
        let repo = MockRepository::default();
        assert!(repo.list_tags().unwrap().is_empty());
        assert!(repo.is_untouched());
    }
}
