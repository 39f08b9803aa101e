//! Main workflow orchestration logic
//!
//! Turns CLI arguments and the configuration file into a real gate run:
//! a `git2` repository, a GitHub release client, and the step outputs the
//! calling CI job reads back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::error::VersionGateError;
use crate::gate::{GateOptions, GateOutcome, VersionGate};
use crate::git::Git2Repository;
use crate::release::GitHubReleases;

/// Arguments for the gate workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
/// This decoupling allows the workflow to be called programmatically
/// without depending on clap. `None` means "use the configuration file".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GateWorkflowArgs {
    /// Repository checkout to operate on
    pub repo_path: PathBuf,

    pub manifest: Option<String>,

    pub field: Option<String>,

    pub remote: Option<String>,

    /// `owner/repo` on the hosting service
    pub repository: Option<String>,

    pub api_url: Option<String>,

    /// Push and API credentials
    pub token: Option<String>,

    pub no_fetch: bool,

    pub repair_release: bool,

    pub dry_run: bool,

    /// File receiving `key=value` step outputs
    pub step_output: Option<PathBuf>,
}

/// Result of a successful gate workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub outcome: GateOutcome,

    pub warnings: Vec<BoundaryWarning>,
}

/// Fold CLI overrides into the loaded configuration
pub fn apply_overrides(mut config: Config, args: &GateWorkflowArgs) -> Config {
    if let Some(manifest) = &args.manifest {
        config.manifest.path = manifest.clone();
    }
    if let Some(field) = &args.field {
        config.manifest.field = field.clone();
    }
    if let Some(remote) = &args.remote {
        config.remote.name = remote.clone();
    }
    if let Some(repository) = &args.repository {
        config.release.repository = Some(repository.clone());
    }
    if let Some(api_url) = &args.api_url {
        config.release.api_url = api_url.clone();
    }
    if args.no_fetch {
        config.remote.fetch_tags = false;
    }
    if args.repair_release {
        config.release.repair_missing = true;
    }
    config
}

/// Build the release client, or `None` when credentials are absent.
///
/// Missing credentials are an error unless this is a dry run, so a real run
/// fails before touching the repository.
fn release_client(
    config: &Config,
    token: Option<&str>,
    dry_run: bool,
) -> Result<Option<GitHubReleases>> {
    let token = token.filter(|t| !t.trim().is_empty());
    match (token, config.release.repository.as_deref()) {
        (Some(token), Some(repository)) => Ok(Some(GitHubReleases::new(
            token,
            repository,
            Some(config.release.api_url.as_str()),
        )?)),
        _ if dry_run => Ok(None),
        (None, _) => Err(VersionGateError::config(
            "No token for the release service (set GITHUB_TOKEN or pass --token)",
        )
        .into()),
        (_, None) => Err(VersionGateError::config(
            "No repository for the release service (set GITHUB_REPOSITORY, --repository or release.repository)",
        )
        .into()),
    }
}

/// Main gate workflow
///
/// 1. Resolve configuration and credentials
/// 2. Open the repository checkout
/// 3. Run the gate (extract, check, tag, push, release)
/// 4. Report step outputs
pub fn run_gate_workflow(args: &GateWorkflowArgs, config: Config) -> Result<WorkflowResult> {
    let config = apply_overrides(config, args);
    debug!(?config, "Effective configuration");

    let releases = release_client(&config, args.token.as_deref(), args.dry_run)?;

    let repo = Git2Repository::open(&args.repo_path)
        .context("Failed to open repository")?
        .with_token(args.token.clone());

    let mut options = GateOptions::from_config(&config);
    options.dry_run = args.dry_run;

    let mut gate = VersionGate::new(&repo, releases.as_ref(), options);
    let outcome = gate.run()?;
    let warnings = gate.warnings().to_vec();

    if let Some(path) = &args.step_output {
        write_step_outputs(path, &outcome)
            .with_context(|| format!("Failed to write step outputs to {}", path.display()))?;
    }

    Ok(WorkflowResult { outcome, warnings })
}

/// Append `released`, `tag` and `version` in the `key=value` format CI runners read
pub fn write_step_outputs(path: &Path, outcome: &GateOutcome) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "released={}", outcome.released())?;
    writeln!(file, "proceed={}", outcome.proceeds())?;
    writeln!(file, "tag={}", outcome.tag())?;
    writeln!(file, "version={}", outcome.version())?;
    Ok(())
}
