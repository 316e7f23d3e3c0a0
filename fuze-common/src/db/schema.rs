//! Declarative table schema and automatic column synchronization
//!
//! The column list below is the single source of truth for the `submissions`
//! table. Startup runs in two phases:
//! 1. **CREATE TABLE IF NOT EXISTS** generated from the column list
//! 2. **Auto-Sync** adds columns missing from an existing table via ALTER TABLE
//!
//! Type and constraint drift cannot be fixed in place by SQLite and is only
//! reported.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

pub const SUBMISSIONS_TABLE: &str = "submissions";

/// Column definition with SQL constraints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnDefinition {
    pub name: &'static str,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL", "BOOLEAN", "TIMESTAMP")
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    pub default_value: Option<&'static str>,
}

impl ColumnDefinition {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            autoincrement: false,
            not_null: false,
            default_value: None,
        }
    }

    /// PRIMARY KEY AUTOINCREMENT, so deleted ids are never handed out again
    pub const fn autoincrement_key(self) -> Self {
        Self {
            primary_key: true,
            autoincrement: true,
            ..self
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    pub const fn default(self, value: &'static str) -> Self {
        Self {
            default_value: Some(value),
            ..self
        }
    }

    /// Column clause as used in CREATE TABLE
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.autoincrement {
            sql.push_str(" AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

/// Expected schema of the submissions table
pub const SUBMISSION_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::new("id", "INTEGER").autoincrement_key(),
    // Company
    ColumnDefinition::new("company_name", "TEXT"),
    ColumnDefinition::new("contact_email", "TEXT"),
    ColumnDefinition::new("contact_phone", "TEXT"),
    ColumnDefinition::new("company_size", "TEXT"),
    ColumnDefinition::new("company_type", "TEXT"),
    // Technology
    ColumnDefinition::new("technology_name", "TEXT"),
    ColumnDefinition::new("technology_description", "TEXT"),
    ColumnDefinition::new("detailed_description", "TEXT"),
    ColumnDefinition::new("technology_category", "TEXT"),
    ColumnDefinition::new("unique_value_proposition", "TEXT"),
    ColumnDefinition::new("military_applications", "TEXT"),
    ColumnDefinition::new("commercial_applications", "TEXT"),
    // Maturity
    ColumnDefinition::new("trl_level", "INTEGER"),
    ColumnDefinition::new("mrl_level", "INTEGER"),
    ColumnDefinition::new("development_stage", "TEXT"),
    ColumnDefinition::new("ip_status", "TEXT"),
    // Team
    ColumnDefinition::new("team_size", "INTEGER"),
    ColumnDefinition::new("team_expertise", "TEXT"),
    // Funding
    ColumnDefinition::new("funding_pathway", "TEXT"),
    ColumnDefinition::new("funding_amount_requested", "REAL"),
    ColumnDefinition::new("previous_fuze_awards", "TEXT"),
    ColumnDefinition::new("previous_fuze_amount", "REAL"),
    ColumnDefinition::new("development_timeline", "TEXT"),
    // Government registrations
    ColumnDefinition::new("sam_gov_registered", "BOOLEAN"),
    ColumnDefinition::new("dsip_registered", "BOOLEAN"),
    // Assessment
    ColumnDefinition::new("capability_score", "REAL"),
    ColumnDefinition::new("ai_assessment", "TEXT"),
    ColumnDefinition::new("recommendation", "TEXT"),
    // Provenance
    ColumnDefinition::new("conversation_transcript", "TEXT"),
    ColumnDefinition::new("extraction_status", "TEXT"),
    ColumnDefinition::new("created_at", "TIMESTAMP")
        .not_null()
        .default("CURRENT_TIMESTAMP"),
    ColumnDefinition::new("updated_at", "TIMESTAMP")
        .not_null()
        .default("CURRENT_TIMESTAMP"),
];

/// CREATE TABLE IF NOT EXISTS statement for a column list
pub fn create_table_sql(table: &str, columns: &[ColumnDefinition]) -> String {
    let body: Vec<String> = columns.iter().map(|c| format!("    {}", c.to_sql())).collect();
    format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", table, body.join(",\n"))
}

/// Actual column from PRAGMA table_info
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub pk: bool,
}

/// Schema drift detected between expected and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    MissingColumn(ColumnDefinition),
    /// Cannot auto-fix - requires manual migration
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
}

/// Read actual columns in database order
pub async fn introspect_table(pool: &SqlitePool, table: &str) -> Result<Vec<ActualColumn>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    let mut columns: Vec<ActualColumn> = rows
        .iter()
        .map(|row| ActualColumn {
            cid: row.get("cid"),
            name: row.get("name"),
            type_name: row.get("type"),
            not_null: row.get::<i32, _>("notnull") != 0,
            pk: row.get::<i32, _>("pk") != 0,
        })
        .collect();
    columns.sort_by_key(|c| c.cid);

    Ok(columns)
}

/// Compare expected schema to actual database schema
pub fn compare(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
    expected
        .iter()
        .filter_map(|expected_col| {
            match actual.iter().find(|c| c.name == expected_col.name) {
                None => Some(SchemaDrift::MissingColumn(*expected_col)),
                Some(actual_col) if !types_compatible(expected_col.sql_type, &actual_col.type_name) => {
                    Some(SchemaDrift::TypeMismatch {
                        column: expected_col.name.to_string(),
                        expected: expected_col.sql_type.to_string(),
                        actual: actual_col.type_name.clone(),
                    })
                }
                Some(_) => None,
            }
        })
        .collect()
}

/// SQLite type affinity comparison
fn types_compatible(expected: &str, actual: &str) -> bool {
    fn affinity(sql_type: &str) -> &'static str {
        let t = sql_type.to_uppercase();
        if t.contains("INT") {
            "INTEGER"
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            "TEXT"
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            "REAL"
        } else {
            "NUMERIC"
        }
    }

    expected.eq_ignore_ascii_case(actual) || affinity(expected) == affinity(actual)
}

/// Add missing columns to an existing table
///
/// Returns the names of the columns that were added.
pub async fn sync_table(
    pool: &SqlitePool,
    table: &str,
    expected: &[ColumnDefinition],
) -> Result<Vec<&'static str>> {
    let actual = introspect_table(pool, table).await?;
    if actual.is_empty() {
        warn!("Table '{}' does not exist - nothing to sync", table);
        return Ok(Vec::new());
    }

    let mut added = Vec::new();
    for drift in compare(expected, &actual) {
        match drift {
            SchemaDrift::MissingColumn(column) => {
                add_column(pool, table, &column).await?;
                added.push(column.name);
            }
            SchemaDrift::TypeMismatch { column, expected, actual } => {
                warn!(
                    "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                    table, column, expected, actual
                );
            }
        }
    }

    if added.is_empty() {
        info!("Schema up to date for '{}'", table);
    }
    Ok(added)
}

async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
    // ALTER TABLE ADD COLUMN accepts NOT NULL only together with a constant
    // DEFAULT, and never PRIMARY KEY.
    let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);
    match (column.not_null, column.default_value) {
        (true, Some(default)) if default != "CURRENT_TIMESTAMP" => {
            sql.push_str(&format!(" NOT NULL DEFAULT {}", default));
        }
        (false, Some(default)) if default != "CURRENT_TIMESTAMP" => {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        (true, _) => {
            warn!(
                "Adding {}.{} without NOT NULL (no constant default available)",
                table, column.name
            );
        }
        _ => {}
    }

    sqlx::query(&sql).execute(pool).await?;
    info!("Added column {}.{} ({})", table, column.name, column.sql_type);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_column_sql() {
        assert_eq!(
            SUBMISSION_COLUMNS[0].to_sql(),
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
        let created_at = SUBMISSION_COLUMNS
            .iter()
            .find(|c| c.name == "created_at")
            .unwrap();
        assert_eq!(
            created_at.to_sql(),
            "created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_schema_matches_settable_fields() {
        // Every settable field has a column; the rest are id + timestamps
        for field in crate::models::SubmissionFields::COLUMNS {
            assert!(
                SUBMISSION_COLUMNS.iter().any(|c| c.name == *field),
                "missing column for field {}",
                field
            );
        }
        assert_eq!(
            SUBMISSION_COLUMNS.len(),
            crate::models::SubmissionFields::COLUMNS.len() + 3
        );
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns() {
        let pool = setup_test_db().await;

        // Schema from before extraction tracking existed
        let legacy: Vec<ColumnDefinition> = SUBMISSION_COLUMNS
            .iter()
            .copied()
            .filter(|c| c.name != "extraction_status")
            .collect();
        sqlx::query(&create_table_sql(SUBMISSIONS_TABLE, &legacy))
            .execute(&pool)
            .await
            .unwrap();

        let added = sync_table(&pool, SUBMISSIONS_TABLE, SUBMISSION_COLUMNS)
            .await
            .unwrap();
        assert_eq!(added, vec!["extraction_status"]);

        let columns = introspect_table(&pool, SUBMISSIONS_TABLE).await.unwrap();
        assert!(columns.iter().any(|c| c.name == "extraction_status"));

        // Second run is a no-op
        let added = sync_table(&pool, SUBMISSIONS_TABLE, SUBMISSION_COLUMNS)
            .await
            .unwrap();
        assert!(added.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_reported_not_fixed() {
        let actual = vec![ActualColumn {
            cid: 0,
            name: "trl_level".to_string(),
            type_name: "TEXT".to_string(),
            not_null: false,
            pk: false,
        }];
        let expected = [ColumnDefinition::new("trl_level", "INTEGER")];

        let drift = compare(&expected, &actual);
        assert_eq!(
            drift,
            vec![SchemaDrift::TypeMismatch {
                column: "trl_level".to_string(),
                expected: "INTEGER".to_string(),
                actual: "TEXT".to_string(),
            }]
        );
    }
}
