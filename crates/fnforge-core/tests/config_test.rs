use fnforge_core::FnforgeConfig;
use fnforge_core::config::DEFAULT_TEMPLATE_URL;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_no_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = FnforgeConfig::load(tmp.path()).unwrap();

    assert_eq!(config.build.parallel, 1);
    assert!(!config.build.strict_options);
    assert_eq!(config.templates.dir, PathBuf::from("./template"));
    assert_eq!(config.templates.url, DEFAULT_TEMPLATE_URL);
}

#[test]
fn load_parses_full_config() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[build]
parallel = 4
strict_options = true

[templates]
dir = "./my-templates"
url = "https://example.com/templates.zip"
"#;
    std::fs::write(tmp.path().join("fnforge.toml"), toml).unwrap();

    let config = FnforgeConfig::load(tmp.path()).unwrap();

    assert_eq!(config.build.parallel, 4);
    assert!(config.build.strict_options);
    assert_eq!(config.templates.dir, PathBuf::from("./my-templates"));
    assert_eq!(config.templates.url, "https://example.com/templates.zip");
}

#[test]
fn load_partial_config_fills_defaults() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[build]
parallel = 3
"#;
    std::fs::write(tmp.path().join("fnforge.toml"), toml).unwrap();

    let config = FnforgeConfig::load(tmp.path()).unwrap();

    assert_eq!(config.build.parallel, 3);
    // Defaults preserved
    assert!(!config.build.strict_options);
    assert_eq!(config.templates.url, DEFAULT_TEMPLATE_URL);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("fnforge.toml"), "not valid {{{{ toml").unwrap();

    let result = FnforgeConfig::load(tmp.path());
    assert!(result.is_err());

    let err = result.unwrap_err().to_string();
    assert!(err.contains("parse"));
}

#[test]
fn load_empty_config_returns_defaults() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("fnforge.toml"), "").unwrap();

    let config = FnforgeConfig::load(tmp.path()).unwrap();
    assert_eq!(config.build.parallel, 1);
}
