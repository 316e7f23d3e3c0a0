//! Command-line arguments shared by the two binaries
//!
//! clap covers the flag and environment tiers; anything left unset falls
//! through to the TOML file and then the compiled defaults.

use crate::collaborator::{CollaboratorError, OpenAiClient};
use clap::Args;
use fuze_common::config::{self, BackendKind, TomlConfig};
use fuze_common::{Result, StoreSettings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "FUZE_ROOT";

/// Config file and record store selection
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// TOML config file (default: <config dir>/fuze/config.toml if present)
    #[arg(long, env = "FUZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Folder holding the SQLite database [env: FUZE_ROOT]
    #[arg(long)]
    pub root_folder: Option<PathBuf>,

    /// Record store backend: sqlite or hosted
    #[arg(long, env = "FUZE_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Hosted backend REST URL, e.g. https://<project>.supabase.co/rest/v1
    #[arg(long, env = "FUZE_HOSTED_URL")]
    pub hosted_url: Option<String>,

    /// Hosted backend API key
    #[arg(long, env = "FUZE_HOSTED_KEY", hide_env_values = true)]
    pub hosted_key: Option<String>,

    /// Hosted backend table name
    #[arg(long, env = "FUZE_HOSTED_TABLE")]
    pub hosted_table: Option<String>,
}

impl StoreArgs {
    pub fn load_toml(&self) -> Result<TomlConfig> {
        TomlConfig::load(self.config.as_deref())
    }

    pub fn store_settings(&self, toml: &TomlConfig) -> Result<StoreSettings> {
        let root_folder =
            config::resolve_root_folder(self.root_folder.as_deref(), ROOT_FOLDER_ENV, toml);
        StoreSettings::resolve(
            self.backend,
            &root_folder,
            self.hosted_url.clone(),
            self.hosted_key.clone(),
            self.hosted_table.clone(),
            toml,
        )
    }
}

/// Credentials for the OpenAI-compatible API
#[derive(Debug, Clone, Args)]
pub struct OpenAiArgs {
    /// API key held by the server
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,
}

impl OpenAiArgs {
    pub fn client(&self, toml: &TomlConfig) -> std::result::Result<OpenAiClient, CollaboratorError> {
        let base_url = self
            .openai_base_url
            .as_deref()
            .or(toml.openai_base_url.as_deref())
            .unwrap_or(config::DEFAULT_OPENAI_BASE_URL);
        let api_key = self
            .openai_api_key
            .clone()
            .or_else(|| toml.openai_api_key.clone());

        OpenAiClient::new(base_url, api_key)
    }
}

/// Install the fmt subscriber; RUST_LOG wins over the TOML level
///
/// The config file is read before a subscriber exists, so its source is
/// reported here.
pub fn init_tracing(toml: &TomlConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &toml.source {
        Some(path) => info!("Loaded config file: {}", path.display()),
        None => info!("No config file found; using defaults"),
    }
}
