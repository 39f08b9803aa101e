use crate::domain::TagName;
use crate::error::{is_already_exists_reason, Result, VersionGateError};
use crate::git::PushOutcome;
use git2::{Cred, CredentialType, Direction, Repository as Git2Repo};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identity used for annotated tags when the repository has no `user.name`/`user.email`
const FALLBACK_TAGGER_NAME: &str = "version-gate";
const FALLBACK_TAGGER_EMAIL: &str = "version-gate@users.noreply.github.com";

/// libgit2 keeps calling the credentials callback until it returns an error
const MAX_CREDENTIAL_ATTEMPTS: usize = 4;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    token: Option<String>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref()).map_err(|e| {
            VersionGateError::repository(format!(
                "Not in a git repository ({}): {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Ok(Git2Repository { repo, token: None })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo, token: None }
    }

    /// Use `token` as the HTTPS password for fetch and push
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Remote callbacks carrying credentials.
    ///
    /// HTTPS remotes get the token as `x-access-token`. SSH remotes try the agent,
    /// then the usual key files under `~/.ssh`.
    fn callbacks(&self) -> git2::RemoteCallbacks<'_> {
        let mut callbacks = git2::RemoteCallbacks::new();
        let attempts = Cell::new(0usize);

        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = self.token.as_deref() {
                    return Cred::userpass_plaintext("x-access-token", token);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    if attempts.get() == 1 {
                        return Ok(cred);
                    }
                }

                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            Cred::default()
        });

        callbacks
    }

    /// Whether the remote currently advertises `refs/tags/<tag>`
    fn remote_has_tag(&self, remote_name: &str, tag: &TagName) -> Result<bool> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            VersionGateError::push_rejected(
                tag.as_str(),
                format!("Cannot find remote '{}': {}", remote_name, e),
            )
        })?;

        let connection = remote
            .connect_auth(Direction::Push, Some(self.callbacks()), None)
            .map_err(|e| {
                VersionGateError::push_rejected(
                    tag.as_str(),
                    format!("Cannot connect to remote '{}': {}", remote_name, e),
                )
            })?;

        let reference = tag.reference();
        let found = connection
            .list()
            .map_err(|e| {
                VersionGateError::push_rejected(
                    tag.as_str(),
                    format!("Cannot list refs on '{}': {}", remote_name, e),
                )
            })?
            .iter()
            .any(|head| head.name() == reference);

        Ok(found)
    }
}

impl super::Repository for Git2Repository {
    fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    fn fetch_tags(&self, remote_name: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            VersionGateError::repository(format!("Remote '{}' not found: {}", remote_name, e))
        })?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(self.callbacks());

        remote
            .fetch(&["+refs/tags/*:refs/tags/*"], Some(&mut fetch_options), None)
            .map_err(|e| {
                VersionGateError::repository(format!(
                    "Failed to fetch tags from remote '{}': {}",
                    remote_name, e
                ))
            })?;

        debug!(remote = remote_name, "Fetched tags");
        Ok(())
    }

    fn tag_exists(&self, tag: &TagName) -> Result<bool> {
        match self.repo.find_reference(&tag.reference()) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) if e.code() == git2::ErrorCode::InvalidSpec => Ok(false),
            Err(e) => Err(VersionGateError::repository(format!(
                "Cannot look up tag '{}': {}",
                tag, e
            ))),
        }
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let tags = self
            .repo
            .tag_names(None)
            .map_err(|e| VersionGateError::repository(format!("Cannot list tags: {}", e)))?;

        Ok(tags.iter().flatten().map(|s| s.to_string()).collect())
    }

    fn create_tag(&self, tag: &TagName, message: Option<&str>) -> Result<()> {
        tag.validate()?;

        let head = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| VersionGateError::tag_creation(format!("Cannot resolve HEAD: {}", e)))?;

        match message {
            Some(message) => {
                let tagger = self
                    .repo
                    .signature()
                    .or_else(|_| git2::Signature::now(FALLBACK_TAGGER_NAME, FALLBACK_TAGGER_EMAIL))
                    .map_err(|e| {
                        VersionGateError::tag_creation(format!("Cannot build tagger: {}", e))
                    })?;

                self.repo
                    .tag(tag.as_str(), head.as_object(), &tagger, message, false)
                    .map_err(|e| {
                        VersionGateError::tag_creation(format!("Cannot create tag '{}': {}", tag, e))
                    })?;
            }
            None => {
                self.repo
                    .tag_lightweight(tag.as_str(), head.as_object(), false)
                    .map_err(|e| {
                        VersionGateError::tag_creation(format!("Cannot create tag '{}': {}", tag, e))
                    })?;
            }
        }

        debug!(tag = %tag, commit = %head.id(), annotated = message.is_some(), "Created local tag");
        Ok(())
    }

    fn delete_tag(&self, tag: &TagName) -> Result<()> {
        self.repo.tag_delete(tag.as_str()).map_err(|e| {
            VersionGateError::repository(format!("Cannot delete local tag '{}': {}", tag, e))
        })?;
        debug!(tag = %tag, "Deleted local tag");
        Ok(())
    }

    fn push_tag(&self, remote_name: &str, tag: &TagName) -> Result<PushOutcome> {
        if self.remote_has_tag(remote_name, tag)? {
            debug!(tag = %tag, remote = remote_name, "Remote already advertises tag");
            return Ok(PushOutcome::AlreadyExists);
        }

        self.send_tag(remote_name, tag)
    }
}

impl Git2Repository {
    /// Push `refs/tags/<tag>` without listing the remote first
    fn send_tag(&self, remote_name: &str, tag: &TagName) -> Result<PushOutcome> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            VersionGateError::push_rejected(
                tag.as_str(),
                format!("Cannot find remote '{}': {}", remote_name, e),
            )
        })?;

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let mut callbacks = self.callbacks();
        callbacks.push_update_reference(|_refname, status| {
            if let Some(status) = status {
                *rejection.borrow_mut() = Some(status.to_string());
            }
            Ok(())
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let reference = tag.reference();
        let refspec = format!("{}:{}", reference, reference);
        let pushed = remote.push(&[refspec.as_str()], Some(&mut push_options));
        drop(push_options);

        push_outcome(tag, pushed, rejection.into_inner())
    }
}

/// Interpret a push: the transport error first, then the per-ref status the
/// remote reported.
fn push_outcome(
    tag: &TagName,
    pushed: std::result::Result<(), git2::Error>,
    rejection: Option<String>,
) -> Result<PushOutcome> {
    if let Err(e) = pushed {
        return if is_already_exists_reason(e.message()) {
            Ok(PushOutcome::AlreadyExists)
        } else {
            Err(VersionGateError::push_rejected(tag.as_str(), e.message()))
        };
    }

    match rejection {
        Some(reason) if is_already_exists_reason(&reason) => Ok(PushOutcome::AlreadyExists),
        Some(reason) => Err(VersionGateError::push_rejected(tag.as_str(), reason)),
        None => Ok(PushOutcome::Pushed),
    }
}
