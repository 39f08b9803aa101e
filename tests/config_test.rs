// tests/config_test.rs
use serial_test::serial;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use version_gate::config::{load_config, Config, CONFIG_FILE_NAME, DEFAULT_API_URL};

#[test]
fn test_load_default_config() {
    let config = Config::default();
    assert_eq!(config.manifest.path, "manifest.json");
    assert_eq!(config.manifest.field, "version");
    assert_eq!(config.tag.prefix, "v");
    assert!(!config.tag.annotated);
    assert_eq!(config.remote.name, "origin");
    assert!(config.remote.fetch_tags);
    assert_eq!(config.release.api_url, DEFAULT_API_URL);
    assert_eq!(config.release.name, "{tag}");
    assert!(!config.release.repair_missing);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[manifest]
path = "custom_components/widget/manifest.json"

[tag]
annotated = true
message = "Widget {version}"

[remote]
name = "upstream"
fetch_tags = false

[release]
repository = "acme/widget"
prerelease = true
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.manifest.path, "custom_components/widget/manifest.json");
    assert_eq!(config.manifest.field, "version");
    assert!(config.tag.annotated);
    assert_eq!(config.tag.message, "Widget {version}");
    assert_eq!(config.remote.name, "upstream");
    assert!(!config.remote.fetch_tags);
    assert_eq!(config.release.repository.as_deref(), Some("acme/widget"));
    assert!(config.release.prerelease);
    assert!(!config.release.draft);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_config(Some(path.to_str().unwrap())).unwrap_err();
    assert!(err.to_string().contains("Cannot read config"));
}

#[test]
fn test_load_invalid_file_fails() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tag]\nannotated = \"yes\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(load_config(Some(temp_file.path().to_str().unwrap())).is_err());
}

#[test]
#[serial]
fn test_load_from_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[manifest]\npath = \"Cargo.toml\"\nfield = \"package.version\"\n",
    )
    .unwrap();

    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = load_config(None);
    std::env::set_current_dir(original_dir).unwrap();

    let config = config.unwrap();
    assert_eq!(config.manifest.path, "Cargo.toml");
    assert_eq!(config.manifest.field, "package.version");
}
