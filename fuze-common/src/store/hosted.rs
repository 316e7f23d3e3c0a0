//! Hosted backend-as-a-service (PostgREST / Supabase REST interface)
//!
//! Row filters use PostgREST operators (`id=eq.7`); writes ask for
//! `Prefer: return=representation` so the number of returned rows doubles as
//! the changed count. Timestamps are assigned here, not by the service.

use super::SubmissionStore;
use crate::models::{Statistics, StatisticsRow, Submission, SubmissionFields};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("fuze-portal/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct IdRow {
    id: i64,
}

pub struct HostedStore {
    client: reqwest::Client,
    /// `<base_url>/<table>`
    endpoint: String,
    api_key: String,
}

impl HostedStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn returning(&self, method: Method) -> RequestBuilder {
        self.request(method).header("Prefer", "return=representation")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Serialize supplied fields and stamp the given timestamp columns
    fn write_body(fields: &SubmissionFields, stamp_columns: &[&str]) -> Result<Value> {
        let mut body = serde_json::to_value(fields)
            .map_err(|e| Error::Internal(format!("Serialize submission fields: {}", e)))?;
        let now = json!(Utc::now());
        if let Some(object) = body.as_object_mut() {
            for column in stamp_columns {
                object.insert((*column).to_string(), now.clone());
            }
        }
        Ok(body)
    }

    fn id_filter(id: i64) -> [(&'static str, String); 2] {
        [("id", format!("eq.{}", id)), ("select", "id".to_string())]
    }
}

#[async_trait]
impl SubmissionStore for HostedStore {
    async fn create(&self, fields: &SubmissionFields) -> Result<i64> {
        let body = Self::write_body(fields, &["created_at", "updated_at"])?;
        let response = self
            .send(self.returning(Method::POST).query(&[("select", "id")]).json(&body))
            .await?;
        let status = response.status().as_u16();

        let rows: Vec<IdRow> = response.json().await?;
        let id = rows.first().map(|row| row.id).ok_or_else(|| Error::Backend {
            status,
            body: "insert returned no rows".to_string(),
        })?;
        debug!(id, "Inserted submission");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Submission>> {
        let response = self
            .send(
                self.request(Method::GET)
                    .query(&[("select", "*"), ("order", "created_at.desc,id.desc")]),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn get(&self, id: i64) -> Result<Option<Submission>> {
        let response = self
            .send(
                self.request(Method::GET)
                    .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())]),
            )
            .await?;
        let rows: Vec<Submission> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn update(&self, id: i64, fields: &SubmissionFields) -> Result<u64> {
        let body = Self::write_body(fields, &["updated_at"])?;
        let response = self
            .send(self.returning(Method::PATCH).query(&Self::id_filter(id)).json(&body))
            .await?;
        let rows: Vec<IdRow> = response.json().await?;
        Ok(rows.len() as u64)
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let response = self
            .send(self.returning(Method::DELETE).query(&Self::id_filter(id)))
            .await?;
        let rows: Vec<IdRow> = response.json().await?;
        Ok(rows.len() as u64)
    }

    async fn statistics(&self) -> Result<Statistics> {
        let response = self
            .send(
                self.request(Method::GET)
                    .query(&[("select", "capability_score,sam_gov_registered,trl_level")]),
            )
            .await?;
        let rows: Vec<StatisticsRow> = response.json().await?;
        Ok(Statistics::from_rows(&rows))
    }

    async fn close(&self) {
        debug!("Hosted store closed (no pooled resources)");
    }

    fn backend_name(&self) -> &'static str {
        "hosted"
    }
}
