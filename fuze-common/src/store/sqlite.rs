//! Embedded SQLite backend
//!
//! Every operation is a single statement. Column names in dynamic statements
//! come only from [`SubmissionFields::COLUMNS`]; values are always bound.
//! Rows are decoded leniently: a cell that does not fit its column type reads
//! back as null.

use super::SubmissionStore;
use crate::coerce;
use crate::db;
use crate::models::{FieldValue, Statistics, StatisticsRow, Submission, SubmissionFields};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use tracing::debug;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::init_database(db_path).await?;
        Ok(Self { pool })
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: FieldValue) {
    match value {
        FieldValue::Text(v) => qb.push_bind(v),
        FieldValue::Integer(v) => qb.push_bind(v),
        FieldValue::Real(v) => qb.push_bind(v),
        FieldValue::Bool(v) => qb.push_bind(v),
    };
}

/// Raw column text, with values SQLite cannot render as text read as null
///
/// Databases written by earlier versions hold whatever the client sent, so a
/// numeric column may contain free text. Reading through text and coercing
/// keeps one bad cell from failing the whole row.
fn lenient_text(row: &SqliteRow, column: &str) -> sqlx::Result<Option<String>> {
    match row.try_get_unchecked::<Option<String>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnDecode { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn lenient_integer(row: &SqliteRow, column: &str) -> sqlx::Result<Option<i64>> {
    Ok(lenient_text(row, column)?.and_then(|s| coerce::integer_value(Value::String(s))))
}

fn lenient_real(row: &SqliteRow, column: &str) -> sqlx::Result<Option<f64>> {
    Ok(lenient_text(row, column)?.and_then(|s| coerce::real_value(Value::String(s))))
}

fn lenient_bool(row: &SqliteRow, column: &str) -> sqlx::Result<Option<bool>> {
    Ok(lenient_text(row, column)?.and_then(|s| coerce::bool_value(Value::String(s))))
}

fn lenient_timestamp(row: &SqliteRow, column: &str) -> sqlx::Result<Option<DateTime<Utc>>> {
    match row.try_get_unchecked::<Option<DateTime<Utc>>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnDecode { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<'r> FromRow<'r, SqliteRow> for Submission {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let text = |column: &str| lenient_text(row, column);

        // Unreadable timestamps fall back to the other one, then the epoch
        let created = lenient_timestamp(row, "created_at")?;
        let updated = lenient_timestamp(row, "updated_at")?;
        let created_at = created.or(updated).unwrap_or_default();
        let updated_at = updated.unwrap_or(created_at);

        Ok(Submission {
            id: row.try_get("id")?,
            company_name: text("company_name")?,
            contact_email: text("contact_email")?,
            contact_phone: text("contact_phone")?,
            company_size: text("company_size")?,
            company_type: text("company_type")?,
            technology_name: text("technology_name")?,
            technology_description: text("technology_description")?,
            detailed_description: text("detailed_description")?,
            technology_category: text("technology_category")?,
            unique_value_proposition: text("unique_value_proposition")?,
            military_applications: text("military_applications")?,
            commercial_applications: text("commercial_applications")?,
            trl_level: lenient_integer(row, "trl_level")?,
            mrl_level: lenient_integer(row, "mrl_level")?,
            development_stage: text("development_stage")?,
            ip_status: text("ip_status")?,
            team_size: lenient_integer(row, "team_size")?,
            team_expertise: text("team_expertise")?,
            funding_pathway: text("funding_pathway")?,
            funding_amount_requested: lenient_real(row, "funding_amount_requested")?,
            previous_fuze_awards: text("previous_fuze_awards")?,
            previous_fuze_amount: lenient_real(row, "previous_fuze_amount")?,
            development_timeline: text("development_timeline")?,
            sam_gov_registered: lenient_bool(row, "sam_gov_registered")?,
            dsip_registered: lenient_bool(row, "dsip_registered")?,
            capability_score: lenient_real(row, "capability_score")?,
            ai_assessment: text("ai_assessment")?,
            // Labels outside the closed set read back as unset
            recommendation: text("recommendation")?.and_then(|s| s.parse().ok()),
            conversation_transcript: text("conversation_transcript")?,
            extraction_status: text("extraction_status")?.and_then(|s| s.parse().ok()),
            created_at,
            updated_at,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for StatisticsRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(StatisticsRow {
            capability_score: lenient_real(row, "capability_score")?,
            sam_gov_registered: lenient_bool(row, "sam_gov_registered")?,
            trl_level: lenient_integer(row, "trl_level")?,
        })
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn create(&self, fields: &SubmissionFields) -> Result<i64> {
        let now = Utc::now();
        let assignments = fields.assignments();

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("INSERT INTO submissions (");
        for (column, _) in &assignments {
            qb.push(column).push(", ");
        }
        qb.push("created_at, updated_at) VALUES (");
        for (_, value) in assignments {
            push_value(&mut qb, value);
            qb.push(", ");
        }
        qb.push_bind(now).push(", ").push_bind(now).push(")");

        let result = qb.build().execute(&self.pool).await?;
        let id = result.last_insert_rowid();
        debug!(id, "Inserted submission");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Submission>> {
        // id breaks ties between records created within the same clock tick
        let submissions = sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn get(&self, id: i64) -> Result<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(submission)
    }

    async fn update(&self, id: i64, fields: &SubmissionFields) -> Result<u64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE submissions SET ");
        for (column, value) in fields.assignments() {
            qb.push(column).push(" = ");
            push_value(&mut qb, value);
            qb.push(", ");
        }
        qb.push("updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(id);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn statistics(&self) -> Result<Statistics> {
        // Aggregated after decoding so legacy text cells count the same way
        // they read back through list and get
        let rows = sqlx::query_as::<_, StatisticsRow>(
            "SELECT capability_score, sam_gov_registered, trl_level FROM submissions",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Statistics::from_rows(&rows))
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
