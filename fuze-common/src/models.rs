//! Submission data model
//!
//! One entity, `Submission`, grouped into facets (company, technology,
//! maturity, team, funding, registration, assessment, provenance). Every
//! structured field is independently nullable.

use crate::coerce;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transcripts at or below this many characters are not worth extracting
pub const MIN_TRANSCRIPT_LEN: usize = 100;

/// Label outside of a closed label set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} label: {value}")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

/// Lowercase, and fold `_` / `-` / runs of whitespace into single spaces
fn normalize_label(s: &str) -> String {
    s.to_ascii_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Categorical assessment outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Fit")]
    StrongFit,
    #[serde(rename = "Moderate Fit")]
    ModerateFit,
    #[serde(rename = "Needs Development")]
    NeedsDevelopment,
    #[serde(rename = "Not Ready")]
    NotReady,
}

impl Recommendation {
    pub const ALL: [Recommendation; 4] = [
        Recommendation::StrongFit,
        Recommendation::ModerateFit,
        Recommendation::NeedsDevelopment,
        Recommendation::NotReady,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongFit => "Strong Fit",
            Recommendation::ModerateFit => "Moderate Fit",
            Recommendation::NeedsDevelopment => "Needs Development",
            Recommendation::NotReady => "Not Ready",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        Recommendation::ALL
            .into_iter()
            .find(|r| normalize_label(r.as_str()) == wanted)
            .ok_or_else(|| ParseLabelError {
                kind: "recommendation",
                value: s.to_string(),
            })
    }
}

/// Where a record stands in transcript extraction
///
/// Written by the reconciliation pass. Records created before the column
/// existed carry no status and are judged by their data shape alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Raw,
    Extracted,
    ExtractionFailed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Raw => "raw",
            ExtractionStatus::Extracted => "extracted",
            ExtractionStatus::ExtractionFailed => "extraction_failed",
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "raw" => Ok(ExtractionStatus::Raw),
            "extracted" => Ok(ExtractionStatus::Extracted),
            "extraction failed" => Ok(ExtractionStatus::ExtractionFailed),
            _ => Err(ParseLabelError {
                kind: "extraction status",
                value: s.to_string(),
            }),
        }
    }
}

/// A stored submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,

    // Company
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub company_size: Option<String>,
    pub company_type: Option<String>,

    // Technology
    pub technology_name: Option<String>,
    pub technology_description: Option<String>,
    pub detailed_description: Option<String>,
    pub technology_category: Option<String>,
    pub unique_value_proposition: Option<String>,
    pub military_applications: Option<String>,
    pub commercial_applications: Option<String>,

    // Maturity
    pub trl_level: Option<i64>,
    pub mrl_level: Option<i64>,
    pub development_stage: Option<String>,
    pub ip_status: Option<String>,

    // Team
    pub team_size: Option<i64>,
    pub team_expertise: Option<String>,

    // Funding
    pub funding_pathway: Option<String>,
    pub funding_amount_requested: Option<f64>,
    pub previous_fuze_awards: Option<String>,
    pub previous_fuze_amount: Option<f64>,
    pub development_timeline: Option<String>,

    // Registration
    pub sam_gov_registered: Option<bool>,
    pub dsip_registered: Option<bool>,

    // Assessment
    pub capability_score: Option<f64>,
    pub ai_assessment: Option<String>,
    #[serde(default, deserialize_with = "coerce::optional_label")]
    pub recommendation: Option<Recommendation>,

    // Provenance
    pub conversation_transcript: Option<String>,
    #[serde(default, deserialize_with = "coerce::optional_label")]
    pub extraction_status: Option<ExtractionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// True when the record holds a real transcript but no company name yet
    pub fn needs_extraction(&self, min_transcript_len: usize) -> bool {
        let has_transcript = self
            .conversation_transcript
            .as_deref()
            .is_some_and(|t| t.chars().count() > min_transcript_len);
        let has_company = self
            .company_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());

        has_transcript && !has_company
    }
}

/// Caller-supplied subset of submission attributes
///
/// Each field is tri-state: `None` = not supplied (left untouched),
/// `Some(None)` = supplied as null, `Some(Some(v))` = supplied value.
/// Values are coerced leniently on deserialization, see [`crate::coerce`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionFields {
    // Company
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub company_size: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub company_type: Option<Option<String>>,

    // Technology
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub technology_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub technology_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub detailed_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub technology_category: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub unique_value_proposition: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub military_applications: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub commercial_applications: Option<Option<String>>,

    // Maturity
    #[serde(default, deserialize_with = "coerce::integer", skip_serializing_if = "Option::is_none")]
    pub trl_level: Option<Option<i64>>,
    #[serde(default, deserialize_with = "coerce::integer", skip_serializing_if = "Option::is_none")]
    pub mrl_level: Option<Option<i64>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub development_stage: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub ip_status: Option<Option<String>>,

    // Team
    #[serde(default, deserialize_with = "coerce::integer", skip_serializing_if = "Option::is_none")]
    pub team_size: Option<Option<i64>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub team_expertise: Option<Option<String>>,

    // Funding
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub funding_pathway: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::real", skip_serializing_if = "Option::is_none")]
    pub funding_amount_requested: Option<Option<f64>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub previous_fuze_awards: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::real", skip_serializing_if = "Option::is_none")]
    pub previous_fuze_amount: Option<Option<f64>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub development_timeline: Option<Option<String>>,

    // Registration
    #[serde(default, deserialize_with = "coerce::boolean", skip_serializing_if = "Option::is_none")]
    pub sam_gov_registered: Option<Option<bool>>,
    #[serde(default, deserialize_with = "coerce::boolean", skip_serializing_if = "Option::is_none")]
    pub dsip_registered: Option<Option<bool>>,

    // Assessment
    #[serde(default, deserialize_with = "coerce::real", skip_serializing_if = "Option::is_none")]
    pub capability_score: Option<Option<f64>>,
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::label", skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Option<Recommendation>>,

    // Provenance
    #[serde(default, deserialize_with = "coerce::text", skip_serializing_if = "Option::is_none")]
    pub conversation_transcript: Option<Option<String>>,
    #[serde(default, deserialize_with = "coerce::label", skip_serializing_if = "Option::is_none")]
    pub extraction_status: Option<Option<ExtractionStatus>>,
}

/// A single bound column value, tagged with its storage class
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
    Bool(Option<bool>),
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        FieldValue::Real(value)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Option<Recommendation>> for FieldValue {
    fn from(value: Option<Recommendation>) -> Self {
        FieldValue::Text(value.map(|r| r.as_str().to_string()))
    }
}

impl From<Option<ExtractionStatus>> for FieldValue {
    fn from(value: Option<ExtractionStatus>) -> Self {
        FieldValue::Text(value.map(|s| s.as_str().to_string()))
    }
}

macro_rules! submission_columns {
    ($($column:ident),* $(,)?) => {
        impl SubmissionFields {
            /// Every caller-settable column, in table order
            pub const COLUMNS: &'static [&'static str] = &[$(stringify!($column)),*];

            /// Supplied `(column, value)` pairs, in table order
            pub fn assignments(&self) -> Vec<(&'static str, FieldValue)> {
                let mut supplied = Vec::new();
                $(
                    if let Some(value) = &self.$column {
                        supplied.push((stringify!($column), FieldValue::from(value.clone())));
                    }
                )*
                supplied
            }
        }
    };
}

submission_columns!(
    company_name,
    contact_email,
    contact_phone,
    company_size,
    company_type,
    technology_name,
    technology_description,
    detailed_description,
    technology_category,
    unique_value_proposition,
    military_applications,
    commercial_applications,
    trl_level,
    mrl_level,
    development_stage,
    ip_status,
    team_size,
    team_expertise,
    funding_pathway,
    funding_amount_requested,
    previous_fuze_awards,
    previous_fuze_amount,
    development_timeline,
    sam_gov_registered,
    dsip_registered,
    capability_score,
    ai_assessment,
    recommendation,
    conversation_transcript,
    extraction_status,
);

impl SubmissionFields {
    /// True when no attribute was supplied
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Drop the provenance fields only the portal itself may write
    pub fn without_provenance(mut self) -> Self {
        self.conversation_transcript = None;
        self.extraction_status = None;
        self
    }

    pub fn with_extraction_status(mut self, status: ExtractionStatus) -> Self {
        self.extraction_status = Some(Some(status));
        self
    }
}

/// Aggregate view over all submissions
///
/// Serialized with the key names the admin dashboard reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "total_submissions")]
    pub total: i64,
    /// Mean of non-null capability scores, 0 when there are none
    #[serde(rename = "avg_score")]
    pub average_capability_score: f64,
    /// Records whose SAM.gov flag is exactly true
    #[serde(rename = "sam_registered")]
    pub registered_count: i64,
    /// Records at technology readiness level 7 or above
    #[serde(rename = "high_trl")]
    pub high_maturity_count: i64,
}

/// The columns statistics are computed from
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsRow {
    pub capability_score: Option<f64>,
    pub sam_gov_registered: Option<bool>,
    pub trl_level: Option<i64>,
}

impl Statistics {
    /// Aggregate in memory, for backends without server-side aggregation
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a StatisticsRow>) -> Self {
        let mut stats = Statistics::default();
        let mut score_sum = 0.0;
        let mut score_count = 0usize;

        for row in rows {
            stats.total += 1;
            if let Some(score) = row.capability_score {
                score_sum += score;
                score_count += 1;
            }
            if row.sam_gov_registered == Some(true) {
                stats.registered_count += 1;
            }
            if row.trl_level.is_some_and(|trl| trl >= 7) {
                stats.high_maturity_count += 1;
            }
        }

        if score_count > 0 {
            stats.average_capability_score = score_sum / score_count as f64;
        }
        stats
    }
}
