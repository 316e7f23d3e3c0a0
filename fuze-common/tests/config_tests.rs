//! Tests for TOML loading, root folder priority and backend selection

use fuze_common::config::{self, BackendKind, TomlConfig};
use fuze_common::{Error, StoreSettings};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[test]
fn test_parse_full_config() {
    let toml = TomlConfig::parse(
        r#"
        root_folder = "/srv/fuze"
        host = "0.0.0.0"
        port = 8080
        backend = "hosted"
        hosted_url = "https://example.supabase.co/rest/v1"
        hosted_api_key = "service-key"
        static_dir = "public"
        extraction_model = "gpt-4o"
        extraction_interval_ms = 500
        extraction_concurrency = 3

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(toml.root_folder, Some(PathBuf::from("/srv/fuze")));
    assert_eq!(toml.port, Some(8080));
    assert_eq!(toml.backend, Some(BackendKind::Hosted));
    assert_eq!(toml.extraction_interval_ms, Some(500));
    assert_eq!(toml.extraction_concurrency, Some(3));
    assert_eq!(toml.log_level(), "debug");
}

#[test]
fn test_empty_config_uses_defaults() {
    let toml = TomlConfig::parse("").unwrap();
    assert!(toml.root_folder.is_none());
    assert!(toml.backend.is_none());
    assert!(toml.source.is_none());
    assert_eq!(toml.log_level(), config::DEFAULT_LOG_LEVEL);
}

#[test]
fn test_malformed_config_is_config_error() {
    let err = TomlConfig::parse("port = \"not a number\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_load_explicit_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = 4100").unwrap();

    let toml = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(toml.port, Some(4100));
    assert_eq!(toml.source.as_deref(), Some(file.path()));
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let err = TomlConfig::load(Some(Path::new("/nonexistent/fuze/config.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_backend_kind_from_str() {
    assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
    assert_eq!(" Hosted ".parse::<BackendKind>().unwrap(), BackendKind::Hosted);
    assert_eq!("supabase".parse::<BackendKind>().unwrap(), BackendKind::Hosted);
    assert!("postgres".parse::<BackendKind>().is_err());
}

#[test]
fn test_root_folder_priority() {
    // Variable names are unique per test so parallel tests cannot interfere
    let env_var = "FUZE_TEST_ROOT_PRIORITY";
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    std::env::remove_var(env_var);
    assert_eq!(
        config::resolve_root_folder(None, env_var, &toml),
        PathBuf::from("/from/toml")
    );

    std::env::set_var(env_var, "/from/env");
    assert_eq!(
        config::resolve_root_folder(None, env_var, &toml),
        PathBuf::from("/from/env")
    );
    assert_eq!(
        config::resolve_root_folder(Some(Path::new("/from/cli")), env_var, &toml),
        PathBuf::from("/from/cli")
    );
    std::env::remove_var(env_var);
}

#[test]
fn test_root_folder_falls_back_to_default() {
    let env_var = "FUZE_TEST_ROOT_UNSET";
    std::env::remove_var(env_var);

    let root = config::resolve_root_folder(None, env_var, &TomlConfig::default());
    assert!(!root.as_os_str().is_empty());
    assert_eq!(
        config::database_path(&root),
        root.join(config::DATABASE_FILE_NAME)
    );
}

#[test]
fn test_sqlite_is_default_backend() {
    let settings = StoreSettings::resolve(
        None,
        Path::new("/srv/fuze"),
        None,
        None,
        None,
        &TomlConfig::default(),
    )
    .unwrap();

    assert_eq!(
        settings,
        StoreSettings::Sqlite {
            database_path: PathBuf::from("/srv/fuze").join(config::DATABASE_FILE_NAME)
        }
    );
}

#[test]
fn test_hosted_backend_merges_toml_values() {
    let toml = TomlConfig {
        backend: Some(BackendKind::Hosted),
        hosted_url: Some("https://toml.example/rest/v1".to_string()),
        hosted_api_key: Some("toml-key".to_string()),
        ..Default::default()
    };

    let settings = StoreSettings::resolve(
        None,
        Path::new("/unused"),
        Some("https://cli.example/rest/v1".to_string()),
        None,
        None,
        &toml,
    )
    .unwrap();

    assert_eq!(
        settings,
        StoreSettings::Hosted {
            base_url: "https://cli.example/rest/v1".to_string(),
            api_key: "toml-key".to_string(),
            table: config::DEFAULT_HOSTED_TABLE.to_string(),
        }
    );
}

#[test]
fn test_hosted_backend_requires_credentials() {
    let err = StoreSettings::resolve(
        Some(BackendKind::Hosted),
        Path::new("/unused"),
        Some("https://example/rest/v1".to_string()),
        Some("   ".to_string()),
        None,
        &TomlConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let err = StoreSettings::resolve(
        Some(BackendKind::Hosted),
        Path::new("/unused"),
        None,
        Some("key".to_string()),
        None,
        &TomlConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
