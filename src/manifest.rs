//! Version extraction from the manifest file.
//!
//! The manifest is parsed according to its extension (`.json` or `.toml`) and a
//! single string field is pulled out by dotted path. No coercion: numbers,
//! tables and empty strings are all reported as a missing field.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::ManifestVersion;
use crate::error::{Result, VersionGateError};

/// Supported manifest encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ManifestFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(ManifestFormat::Toml),
            _ => None,
        }
    }
}

/// Read the manifest at `path` and extract the version at `field`.
///
/// # Returns
/// * `Ok(ManifestVersion)` - Non-empty version string
/// * `Err(ManifestUnreadable)` - File absent, unreadable, or not parsable
/// * `Err(FieldMissing)` - Field absent, not a string, or empty
pub fn extract_version(path: &Path, field: &str) -> Result<ManifestVersion> {
    let contents = fs::read_to_string(path).map_err(|e| {
        VersionGateError::manifest_unreadable(format!("{}: {}", path.display(), e))
    })?;

    let version = match ManifestFormat::from_path(path) {
        Some(format) => extract_from_str(&contents, format, field),
        None => extract_from_str(&contents, ManifestFormat::Json, field).or_else(|err| {
            match err {
                VersionGateError::ManifestUnreadable(_) => {
                    extract_from_str(&contents, ManifestFormat::Toml, field)
                }
                other => Err(other),
            }
        }),
    }
    .map_err(|err| match err {
        VersionGateError::ManifestUnreadable(reason) => {
            VersionGateError::manifest_unreadable(format!("{}: {}", path.display(), reason))
        }
        VersionGateError::FieldMissing(reason) => {
            VersionGateError::field_missing(format!("{} in {}", reason, path.display()))
        }
        other => other,
    })?;

    debug!(manifest = %path.display(), field, version = %version, "Extracted manifest version");
    Ok(version)
}

/// Extract the version field from manifest text of a known format.
pub fn extract_from_str(
    contents: &str,
    format: ManifestFormat,
    field: &str,
) -> Result<ManifestVersion> {
    let segments: Vec<&str> = field.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(VersionGateError::config(format!(
            "Invalid version field path '{}'",
            field
        )));
    }

    let raw = match format {
        ManifestFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(contents)
                .map_err(|e| VersionGateError::manifest_unreadable(format!("invalid JSON: {}", e)))?;
            lookup_json(&value, &segments, field)?
        }
        ManifestFormat::Toml => {
            let value: toml::Value = toml::from_str(contents)
                .map_err(|e| VersionGateError::manifest_unreadable(format!("invalid TOML: {}", e)))?;
            lookup_toml(&value, &segments, field)?
        }
    };

    ManifestVersion::new(raw)
        .map_err(|_| VersionGateError::field_missing(format!("field '{}' is empty", field)))
}

fn lookup_json(value: &serde_json::Value, segments: &[&str], field: &str) -> Result<String> {
    let mut current = value;
    for segment in segments {
        current = current
            .get(*segment)
            .ok_or_else(|| VersionGateError::field_missing(format!("field '{}' not found", field)))?;
    }

    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| VersionGateError::field_missing(format!("field '{}' is not a string", field)))
}

fn lookup_toml(value: &toml::Value, segments: &[&str], field: &str) -> Result<String> {
    let mut current = value;
    for segment in segments {
        current = current
            .get(*segment)
            .ok_or_else(|| VersionGateError::field_missing(format!("field '{}' not found", field)))?;
    }

    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| VersionGateError::field_missing(format!("field '{}' is not a string", field)))
}
