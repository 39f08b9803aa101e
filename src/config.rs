use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, VersionGateError};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "versiongate.toml";

/// Default GitHub REST API base.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Represents the complete configuration for version-gate.
///
/// Contains where the version lives, how tags are named, which remote to talk to,
/// and how releases are created.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub tag: TagConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub release: ReleaseConfig,
}

fn default_manifest_path() -> String {
    "manifest.json".to_string()
}

fn default_version_field() -> String {
    "version".to_string()
}

/// Location of the version string.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestConfig {
    /// Manifest path, relative to the repository working directory
    #[serde(default = "default_manifest_path")]
    pub path: String,

    /// Dotted path of the version field (e.g. `version`, `package.version`)
    #[serde(default = "default_version_field")]
    pub field: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        ManifestConfig {
            path: default_manifest_path(),
            field: default_version_field(),
        }
    }
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

fn default_tag_message() -> String {
    "Release {tag}".to_string()
}

/// Tag naming and tag object settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagConfig {
    #[serde(default = "default_tag_prefix")]
    pub prefix: String,

    /// Create annotated tags instead of lightweight ones
    #[serde(default)]
    pub annotated: bool,

    /// Annotated tag message; `{tag}` and `{version}` are substituted
    #[serde(default = "default_tag_message")]
    pub message: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            prefix: default_tag_prefix(),
            annotated: false,
            message: default_tag_message(),
        }
    }
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

/// Remote used for the tag check and the push.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_name")]
    pub name: String,

    /// Fetch remote tags before checking whether the tag exists
    #[serde(default = "default_true")]
    pub fetch_tags: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            name: default_remote_name(),
            fetch_tags: true,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_release_name() -> String {
    "{tag}".to_string()
}

/// Hosting-service release settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// `owner/repo` on the hosting service
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Release title; `{tag}` and `{version}` are substituted
    #[serde(default = "default_release_name")]
    pub name: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub prerelease: bool,

    /// Create a missing release for an already existing tag
    #[serde(default)]
    pub repair_missing: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            repository: None,
            api_url: default_api_url(),
            name: default_release_name(),
            draft: false,
            prerelease: false,
            repair_missing: false,
        }
    }
}

/// Split an `owner/repo` slug into its two parts.
pub fn parse_repository_slug(slug: &str) -> Result<(String, String)> {
    match slug.trim().split_once('/') {
        Some((owner, repo))
            if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
        {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(VersionGateError::config(format!(
            "Invalid repository '{}' - expected OWNER/REPO",
            slug
        ))),
    }
}

/// Substitute `{tag}` and `{version}` in a template.
pub fn render_template(template: &str, tag: &str, version: &str) -> String {
    template.replace("{tag}", tag).replace("{version}", version)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `versiongate.toml` in current directory
/// 3. `~/.config/.versiongate.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path).map_err(|e| {
            VersionGateError::config(format!("Cannot read config '{}': {}", path, e))
        })?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parse configuration from TOML text.
pub fn parse_config(config_str: &str) -> Result<Config> {
    toml::from_str(config_str)
        .map_err(|e| VersionGateError::config(format!("Invalid configuration: {}", e)))
}
