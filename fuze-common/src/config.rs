//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binaries get tiers 1 and 2 from clap; this module supplies the TOML
//! file and the defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// SQLite file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "fuze_submissions.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOSTED_TABLE: &str = "submissions";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_EXTRACTION_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_EXTRACTION_CONCURRENCY: usize = 1;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Which record store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded SQLite file in the root folder
    #[default]
    Sqlite,
    /// Hosted PostgREST-style backend-as-a-service
    Hosted,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "hosted" | "supabase" => Ok(BackendKind::Hosted),
            other => Err(Error::Config(format!(
                "Unknown backend '{}' (expected 'sqlite' or 'hosted')",
                other
            ))),
        }
    }
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: Option<String>,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backend: Option<BackendKind>,
    pub hosted_url: Option<String>,
    pub hosted_api_key: Option<String>,
    pub hosted_table: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub extraction_model: Option<String>,
    pub extraction_interval_ms: Option<u64>,
    pub extraction_concurrency: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the values were read from; `None` when running on defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl TomlConfig {
    /// Load the TOML config
    ///
    /// An explicitly named file must exist and parse. Without one, the
    /// platform default location is tried and a missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let mut config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.source = Some(path);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Log filter to use when RUST_LOG is unset
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Root folder resolution: CLI argument → environment variable → TOML → default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Path of the SQLite database under a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Existing config file at the platform default location, if any
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fuze").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fuze/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fuze (or /var/lib/fuze for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("fuze"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fuze"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/fuze
        dirs::data_dir()
            .map(|d| d.join("fuze"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fuze"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\fuze
        dirs::data_local_dir()
            .map(|d| d.join("fuze"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fuze"))
    } else {
        PathBuf::from("./fuze_data")
    }
}
