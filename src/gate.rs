//! The release decision.
//!
//! A run reads the manifest version, derives the tag name and proceeds only
//! when that exact tag does not exist yet. On "proceed" it creates and pushes
//! the tag, then creates the release. Any error aborts the remaining steps;
//! nothing already done is rolled back.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::boundary::BoundaryWarning;
use crate::config::{render_template, Config};
use crate::domain::{ManifestVersion, TagName};
use crate::error::{Result, VersionGateError};
use crate::git::{PushOutcome, Repository};
use crate::manifest;
use crate::release::{Release, ReleaseRequest, ReleaseService};

/// Everything a gate run needs to know besides its collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct GateOptions {
    /// Manifest path; relative paths resolve against the repository working directory
    pub manifest_path: PathBuf,
    /// Dotted path of the version field
    pub field: String,
    pub tag_prefix: String,
    /// Annotated tag message template; lightweight tags when `None`
    pub tag_message: Option<String>,
    pub remote: String,
    pub fetch_tags: bool,
    /// Release title template
    pub release_name: String,
    pub draft: bool,
    pub prerelease: bool,
    /// Create a missing release for an already existing tag
    pub repair_missing_release: bool,
    /// Decide only, never mutate
    pub dry_run: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        GateOptions::from_config(&Config::default())
    }
}

impl GateOptions {
    pub fn from_config(config: &Config) -> Self {
        GateOptions {
            manifest_path: PathBuf::from(&config.manifest.path),
            field: config.manifest.field.clone(),
            tag_prefix: config.tag.prefix.clone(),
            tag_message: config
                .tag
                .annotated
                .then(|| config.tag.message.clone()),
            remote: config.remote.name.clone(),
            fetch_tags: config.remote.fetch_tags,
            release_name: config.release.name.clone(),
            draft: config.release.draft,
            prerelease: config.release.prerelease,
            repair_missing_release: config.release.repair_missing,
            dry_run: false,
        }
    }
}

/// What a gate run did
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// New version: tag pushed and release created.
    /// `release` is `None` when the service reported the release as already present.
    Released {
        version: ManifestVersion,
        tag: TagName,
        release: Option<Release>,
    },
    /// The tag already existed; nothing was changed
    AlreadyTagged { version: ManifestVersion, tag: TagName },
    /// A concurrent run pushed the tag first; no release was created here
    LostRace { version: ManifestVersion, tag: TagName },
    /// The tag existed without a release and the release was created
    ReleaseRepaired {
        version: ManifestVersion,
        tag: TagName,
        release: Release,
    },
    /// Decision only
    DryRun {
        version: ManifestVersion,
        tag: TagName,
        proceed: bool,
    },
}

impl GateOutcome {
    pub fn version(&self) -> &ManifestVersion {
        match self {
            GateOutcome::Released { version, .. }
            | GateOutcome::AlreadyTagged { version, .. }
            | GateOutcome::LostRace { version, .. }
            | GateOutcome::ReleaseRepaired { version, .. }
            | GateOutcome::DryRun { version, .. } => version,
        }
    }

    pub fn tag(&self) -> &TagName {
        match self {
            GateOutcome::Released { tag, .. }
            | GateOutcome::AlreadyTagged { tag, .. }
            | GateOutcome::LostRace { tag, .. }
            | GateOutcome::ReleaseRepaired { tag, .. }
            | GateOutcome::DryRun { tag, .. } => tag,
        }
    }

    /// The gate decision: was this a new version?
    pub fn proceeds(&self) -> bool {
        match self {
            GateOutcome::Released { .. } | GateOutcome::LostRace { .. } => true,
            GateOutcome::DryRun { proceed, .. } => *proceed,
            GateOutcome::AlreadyTagged { .. } | GateOutcome::ReleaseRepaired { .. } => false,
        }
    }

    /// Whether this run created a release
    pub fn released(&self) -> bool {
        match self {
            GateOutcome::Released { release, .. } => release.is_some(),
            GateOutcome::ReleaseRepaired { .. } => true,
            _ => false,
        }
    }
}

/// Decides whether the manifest version needs a release and performs it.
pub struct VersionGate<'a, R: Repository, S: ReleaseService> {
    repo: &'a R,
    releases: Option<&'a S>,
    options: GateOptions,
    warnings: Vec<BoundaryWarning>,
}

impl<'a, R: Repository, S: ReleaseService> VersionGate<'a, R, S> {
    /// `releases` may be `None` only for dry runs
    pub fn new(repo: &'a R, releases: Option<&'a S>, options: GateOptions) -> Self {
        VersionGate {
            repo,
            releases,
            options,
            warnings: Vec::new(),
        }
    }

    /// Warnings collected by the last run
    pub fn warnings(&self) -> &[BoundaryWarning] {
        &self.warnings
    }

    fn warn(&mut self, warning: BoundaryWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn manifest_path(&self) -> PathBuf {
        resolve_manifest_path(self.repo.workdir().as_deref(), &self.options.manifest_path)
    }

    fn tag_for(&self, version: &ManifestVersion) -> TagName {
        TagName::for_version(&self.options.tag_prefix, version)
    }

    fn release_service(&self) -> Result<&'a S> {
        self.releases
            .ok_or_else(|| VersionGateError::config("No release service configured"))
    }

    /// Read the version from the manifest
    pub fn extract_version(&self) -> Result<ManifestVersion> {
        manifest::extract_version(&self.manifest_path(), &self.options.field)
    }

    /// Whether `<prefix><version>` is already in the tag namespace (exact match)
    pub fn tag_exists(&self, version: &ManifestVersion) -> Result<bool> {
        let tag = self.tag_for(version);
        let exists = self.repo.tag_exists(&tag)?;
        debug!(tag = %tag, exists, "Checked tag");
        Ok(exists)
    }

    /// Create the tag at HEAD and push it
    pub fn create_tag_and_push(&self, version: &ManifestVersion) -> Result<PushOutcome> {
        let tag = self.tag_for(version);
        let message = self
            .options
            .tag_message
            .as_deref()
            .map(|template| render_template(template, tag.as_str(), version.as_str()));

        self.repo.create_tag(&tag, message.as_deref())?;
        info!(tag = %tag, "Created tag");

        let outcome = match self.repo.push_tag(&self.options.remote, &tag) {
            Ok(outcome) => outcome,
            Err(err) if err.is_benign() => PushOutcome::AlreadyExists,
            Err(err) => {
                // a local tag left behind would read as "already tagged" on the next run
                if let Err(cleanup) = self.repo.delete_tag(&tag) {
                    warn!(tag = %tag, error = %cleanup, "Could not remove unpushed tag");
                }
                return Err(err);
            }
        };
        if outcome == PushOutcome::Pushed {
            info!(tag = %tag, remote = %self.options.remote, "Pushed tag");
        }
        Ok(outcome)
    }

    /// Ask the hosting service for a release of the tag with generated notes
    pub fn create_release(&self, version: &ManifestVersion) -> Result<Release> {
        let tag = self.tag_for(version);
        let request = ReleaseRequest {
            name: render_template(&self.options.release_name, tag.as_str(), version.as_str()),
            tag,
            draft: self.options.draft,
            prerelease: self.options.prerelease,
        };

        let release = self.release_service()?.create_release(&request)?;
        info!(tag = %request.tag, id = release.id, "Created release");
        Ok(release)
    }

    /// Run the whole gate once.
    pub fn run(&mut self) -> Result<GateOutcome> {
        self.warnings.clear();
        if !self.options.dry_run {
            self.release_service()?;
        }

        let version = self.extract_version()?;
        let tag = self.tag_for(&version);
        if version.semver().is_none() {
            self.warn(BoundaryWarning::NonSemverVersion {
                version: version.to_string(),
            });
        }

        if self.options.fetch_tags {
            self.repo.fetch_tags(&self.options.remote)?;
        }

        if self.tag_exists(&version)? {
            info!(tag = %tag, "Version already tagged");
            return self.handle_existing_tag(version, tag);
        }

        self.check_ordering(&version);

        if self.options.dry_run {
            return Ok(GateOutcome::DryRun {
                version,
                tag,
                proceed: true,
            });
        }

        if self.create_tag_and_push(&version)? == PushOutcome::AlreadyExists {
            self.warn(BoundaryWarning::TagPushedConcurrently {
                tag: tag.to_string(),
            });
            return Ok(GateOutcome::LostRace { version, tag });
        }

        let release = match self.create_release(&version) {
            Ok(release) => Some(release),
            Err(err) if err.is_benign() => {
                self.warn(BoundaryWarning::ReleaseAlreadyExists {
                    tag: tag.to_string(),
                });
                None
            }
            Err(err) => return Err(err),
        };

        Ok(GateOutcome::Released {
            version,
            tag,
            release,
        })
    }

    fn handle_existing_tag(
        &mut self,
        version: ManifestVersion,
        tag: TagName,
    ) -> Result<GateOutcome> {
        if self.options.dry_run {
            return Ok(GateOutcome::DryRun {
                version,
                tag,
                proceed: false,
            });
        }

        let service = self.release_service()?;
        if !self.options.repair_missing_release {
            // read-only probe so the operator learns about a tag left without release
            match service.release_exists(&tag) {
                Ok(false) => self.warn(BoundaryWarning::ReleaseMissingForTag {
                    tag: tag.to_string(),
                }),
                Ok(true) => {}
                Err(err) => debug!(error = %err, "Release lookup skipped"),
            }
            return Ok(GateOutcome::AlreadyTagged { version, tag });
        }

        if service.release_exists(&tag)? {
            return Ok(GateOutcome::AlreadyTagged { version, tag });
        }

        info!(tag = %tag, "Repairing missing release");
        match self.create_release(&version) {
            Ok(release) => Ok(GateOutcome::ReleaseRepaired {
                version,
                tag,
                release,
            }),
            Err(err) if err.is_benign() => Ok(GateOutcome::AlreadyTagged { version, tag }),
            Err(err) => Err(err),
        }
    }

    /// Warn when the version sorts below the highest existing tag; never blocks
    fn check_ordering(&mut self, version: &ManifestVersion) {
        let Some(current) = version.semver() else {
            return;
        };

        let tags = match self.repo.list_tags() {
            Ok(tags) => tags,
            Err(err) => {
                debug!(error = %err, "Cannot list tags for ordering check");
                return;
            }
        };

        let highest = tags
            .iter()
            .filter_map(|name| {
                TagName::semver_of(name, &self.options.tag_prefix).map(|v| (v, name))
            })
            .max_by(|a, b| a.0.cmp(&b.0));

        if let Some((highest_version, highest_tag)) = highest {
            if current < highest_version {
                let warning = BoundaryWarning::VersionNotAhead {
                    version: version.to_string(),
                    highest_tag: highest_tag.clone(),
                };
                self.warn(warning);
            }
        }
    }
}

/// Resolve a manifest path against the repository working directory
pub fn resolve_manifest_path(workdir: Option<&Path>, manifest_path: &Path) -> PathBuf {
    match workdir {
        Some(dir) if manifest_path.is_relative() => dir.join(manifest_path),
        _ => manifest_path.to_path_buf(),
    }
}
