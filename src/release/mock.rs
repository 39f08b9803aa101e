use crate::domain::TagName;
use crate::error::{Result, VersionGateError};
use crate::release::{Release, ReleaseRequest, ReleaseService};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Mock release service for testing
///
/// Cloning shares the underlying store, so concurrent gates can talk to the
/// same "hosting service".
#[derive(Clone, Default)]
pub struct MockReleaseService {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    releases: Mutex<BTreeMap<String, Release>>,
    create_calls: Mutex<Vec<ReleaseRequest>>,
    lookup_calls: Mutex<Vec<String>>,
    error_on_create: Mutex<Option<String>>,
}

impl MockReleaseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing release for `tag`
    pub fn add_release(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let mut releases = lock(&self.inner.releases);
        let id = releases.len() as u64 + 1;
        releases.insert(
            tag.clone(),
            Release {
                id,
                tag_name: tag,
                html_url: None,
            },
        );
    }

    /// Make every `create_release` fail as unavailable
    pub fn fail_create(&self, message: impl Into<String>) {
        *lock(&self.inner.error_on_create) = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *lock(&self.inner.error_on_create) = None;
    }

    pub fn release_tags(&self) -> Vec<String> {
        lock(&self.inner.releases).keys().cloned().collect()
    }

    pub fn create_calls(&self) -> Vec<ReleaseRequest> {
        lock(&self.inner.create_calls).clone()
    }

    pub fn lookup_calls(&self) -> Vec<String> {
        lock(&self.inner.lookup_calls).clone()
    }
}

impl ReleaseService for MockReleaseService {
    fn release_exists(&self, tag: &TagName) -> Result<bool> {
        lock(&self.inner.lookup_calls).push(tag.to_string());
        Ok(lock(&self.inner.releases).contains_key(tag.as_str()))
    }

    fn create_release(&self, request: &ReleaseRequest) -> Result<Release> {
        lock(&self.inner.create_calls).push(request.clone());
        if let Some(message) = lock(&self.inner.error_on_create).clone() {
            return Err(VersionGateError::release_unavailable(message));
        }

        let mut releases = lock(&self.inner.releases);
        if releases.contains_key(request.tag.as_str()) {
            return Err(VersionGateError::DuplicateRelease(request.tag.to_string()));
        }

        let release = Release {
            id: releases.len() as u64 + 1,
            tag_name: request.tag.to_string(),
            html_url: None,
        };
        releases.insert(request.tag.to_string(), release.clone());
        Ok(release)
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
    fn test_mock_release_create_then_duplicate() {
        let service = MockReleaseService::new();
        let request = ReleaseRequest::for_tag(tag("1.0.0"));

        service.create_release(&request).unwrap();
        let err = service.create_release(&request).unwrap_err();

        assert!(matches!(err, VersionGateError::DuplicateRelease(_)));
        assert_eq!(service.release_tags(), vec!["v1.0.0".to_string()]);
        assert_eq!(service.create_calls().len(), 2);
    }

    #[test]
    fn test_mock_release_clones_share_state() {
        let service = MockReleaseService::new();
        let other = service.clone();
        other.add_release("v1.0.0");

        assert!(service.release_exists(&tag("1.0.0")).unwrap());
    }
}
