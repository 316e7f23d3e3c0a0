//! Record store contract
//!
//! One trait, two interchangeable backends. Callers hold an
//! `Arc<dyn SubmissionStore>` built by [`open_store`] and never branch on the
//! backend. A missing id is a normal empty result (`None` / `0`), never an
//! error; errors mean the store itself is unavailable.

mod hosted;
mod sqlite;

pub use hosted::HostedStore;
pub use sqlite::SqliteStore;

use crate::config::{self, BackendKind, TomlConfig};
use crate::models::{Statistics, Submission, SubmissionFields};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a record with the supplied fields; unsupplied fields are null
    async fn create(&self, fields: &SubmissionFields) -> Result<i64>;

    /// All records, newest created first
    async fn list(&self) -> Result<Vec<Submission>>;

    async fn get(&self, id: i64) -> Result<Option<Submission>>;

    /// Merge supplied fields and refresh `updated_at`
    ///
    /// Returns the number of records changed: 0 if `id` is absent, else 1.
    async fn update(&self, id: i64, fields: &SubmissionFields) -> Result<u64>;

    /// Hard delete; returns 0 if `id` is absent, else 1
    async fn delete(&self, id: i64) -> Result<u64>;

    async fn statistics(&self) -> Result<Statistics>;

    /// Release backend resources; the store must not be used afterwards
    async fn close(&self);

    fn backend_name(&self) -> &'static str;
}

/// Resolved backend selection
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Sqlite {
        database_path: PathBuf,
    },
    Hosted {
        base_url: String,
        api_key: String,
        table: String,
    },
}

impl StoreSettings {
    /// Build settings from already-merged CLI/env values, falling back to TOML
    pub fn resolve(
        backend: Option<BackendKind>,
        root_folder: &Path,
        hosted_url: Option<String>,
        hosted_api_key: Option<String>,
        hosted_table: Option<String>,
        toml: &TomlConfig,
    ) -> Result<Self> {
        match backend.or(toml.backend).unwrap_or_default() {
            BackendKind::Sqlite => Ok(StoreSettings::Sqlite {
                database_path: config::database_path(root_folder),
            }),
            BackendKind::Hosted => {
                let base_url = hosted_url
                    .or_else(|| toml.hosted_url.clone())
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| Error::Config("Hosted backend selected but no URL configured".to_string()))?;
                let api_key = hosted_api_key
                    .or_else(|| toml.hosted_api_key.clone())
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| Error::Config("Hosted backend selected but no API key configured".to_string()))?;
                let table = hosted_table
                    .or_else(|| toml.hosted_table.clone())
                    .unwrap_or_else(|| config::DEFAULT_HOSTED_TABLE.to_string());

                Ok(StoreSettings::Hosted {
                    base_url,
                    api_key,
                    table,
                })
            }
        }
    }
}

/// Construct the configured store
pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn SubmissionStore>> {
    match settings {
        StoreSettings::Sqlite { database_path } => {
            info!("Record store: SQLite at {}", database_path.display());
            Ok(Arc::new(SqliteStore::open(database_path).await?))
        }
        StoreSettings::Hosted {
            base_url,
            api_key,
            table,
        } => {
            info!("Record store: hosted backend at {} (table '{}')", base_url, table);
            Ok(Arc::new(HostedStore::new(base_url, api_key, table)?))
        }
    }
}
