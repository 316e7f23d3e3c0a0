//! Transcript reconciliation pass
//!
//! Finds records that hold a conversation transcript but no structured data,
//! asks the collaborator to extract the fields, and writes them back. Every
//! per-record failure is contained: the pass always runs to the end of the
//! backlog and reports what happened.

use super::{prompt, reply};
use crate::collaborator::Collaborator;
use fuze_common::config::{
    DEFAULT_EXTRACTION_CONCURRENCY, DEFAULT_EXTRACTION_INTERVAL_MS, DEFAULT_EXTRACTION_MODEL,
};
use fuze_common::models::MIN_TRANSCRIPT_LEN;
use fuze_common::{
    Error, ExtractionStatus, Result, Submission, SubmissionFields, SubmissionStore,
};
use futures::stream::{self, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub model: String,
    /// Minimum spacing between collaborator calls; zero disables spacing
    pub interval: Duration,
    /// Records in flight at once
    pub concurrency: usize,
    /// Also retry records whose previous extraction reply was malformed
    pub retry_failed: bool,
    pub min_transcript_len: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_EXTRACTION_MODEL.to_string(),
            interval: Duration::from_millis(DEFAULT_EXTRACTION_INTERVAL_MS),
            concurrency: DEFAULT_EXTRACTION_CONCURRENCY,
            retry_failed: false,
            min_transcript_len: MIN_TRANSCRIPT_LEN,
        }
    }
}

/// Result of processing one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fields written, status `extracted`
    Extracted,
    /// Reply unusable, status `extraction_failed`
    Malformed,
    /// Collaborator unreachable or refused; record untouched
    CollaboratorFailed,
    /// Store rejected the write
    StoreFailed,
    /// Record deleted while being processed
    Vanished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub candidates: usize,
    pub extracted: usize,
    pub malformed: usize,
    pub collaborator_failures: usize,
    pub store_failures: usize,
    pub vanished: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Extracted => self.extracted += 1,
            Outcome::Malformed => self.malformed += 1,
            Outcome::CollaboratorFailed => self.collaborator_failures += 1,
            Outcome::StoreFailed => self.store_failures += 1,
            Outcome::Vanished => self.vanished += 1,
        }
    }

    /// Records that did not end up extracted
    pub fn failures(&self) -> usize {
        self.malformed + self.collaborator_failures + self.store_failures
    }

    /// Every candidate was extracted or has since been deleted
    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates: {} extracted, {} malformed, {} collaborator failures, {} store failures, {} vanished",
            self.candidates,
            self.extracted,
            self.malformed,
            self.collaborator_failures,
            self.store_failures,
            self.vanished
        )
    }
}

/// Selection rule for the batch pass
pub fn is_candidate(submission: &Submission, options: &ReconcileOptions) -> bool {
    if !submission.needs_extraction(options.min_transcript_len) {
        return false;
    }
    match submission.extraction_status {
        Some(ExtractionStatus::Extracted) => false,
        Some(ExtractionStatus::ExtractionFailed) => options.retry_failed,
        Some(ExtractionStatus::Raw) | None => true,
    }
}

pub struct Reconciler {
    store: Arc<dyn SubmissionStore>,
    collaborator: Arc<dyn Collaborator>,
    options: ReconcileOptions,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        collaborator: Arc<dyn Collaborator>,
        options: ReconcileOptions,
    ) -> Self {
        // Quota::with_period is None for a zero interval
        let limiter = Quota::with_period(options.interval).map(RateLimiter::direct);

        Self {
            store,
            collaborator,
            options,
            limiter,
        }
    }

    /// Records the batch pass would process, newest first
    pub async fn candidates(&self) -> Result<Vec<Submission>> {
        let submissions = self.store.list().await?;
        Ok(submissions
            .into_iter()
            .filter(|s| is_candidate(s, &self.options))
            .collect())
    }

    /// Process the whole backlog
    ///
    /// Fails only when the candidate list cannot be read.
    pub async fn run(&self) -> Result<ReconcileReport> {
        let candidates = self.candidates().await?;
        let mut report = ReconcileReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            info!("No submissions need extraction");
            return Ok(report);
        }
        info!(
            "Found {} submissions needing extraction (concurrency {}, interval {:?})",
            candidates.len(),
            self.options.concurrency.max(1),
            self.options.interval
        );

        let outcomes: Vec<Outcome> = stream::iter(candidates.iter())
            .map(|submission| {
                let transcript = submission.conversation_transcript.as_deref().unwrap_or_default();
                self.extract(submission.id, transcript)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        info!("Extraction pass complete: {}", report);
        Ok(report)
    }

    /// Extract one record regardless of the selection rule
    pub async fn extract_by_id(&self, id: i64) -> Result<Outcome> {
        let submission = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Submission {}", id)))?;

        let transcript = submission
            .conversation_transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Submission {} has no conversation transcript", id))
            })?;

        Ok(self.extract(id, transcript).await)
    }

    async fn extract(&self, id: i64, transcript: &str) -> Outcome {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        debug!(id, chars = transcript.chars().count(), "Requesting extraction");

        let request = prompt::extraction_request(&self.options.model, transcript);
        let reply = match self.collaborator.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(id, "Extraction request failed: {}", e);
                return Outcome::CollaboratorFailed;
            }
        };

        let (fields, outcome) = match reply::parse_reply(&reply) {
            Ok(fields) => {
                if fields.is_empty() {
                    warn!(id, "Extraction reply carried no submission fields");
                }
                let company = fields
                    .company_name
                    .clone()
                    .flatten()
                    .unwrap_or_else(|| "Unknown".to_string());
                info!(id, company = %company, "Extracted submission");
                (
                    fields.with_extraction_status(ExtractionStatus::Extracted),
                    Outcome::Extracted,
                )
            }
            Err(e) => {
                warn!(id, "Skipping submission, unusable extraction reply: {}", e);
                (
                    SubmissionFields::default().with_extraction_status(ExtractionStatus::ExtractionFailed),
                    Outcome::Malformed,
                )
            }
        };

        match self.store.update(id, &fields).await {
            Ok(0) => {
                warn!(id, "Submission was deleted during extraction");
                Outcome::Vanished
            }
            Ok(_) => outcome,
            Err(e) => {
                error!(id, "Failed to store extraction result: {}", e);
                Outcome::StoreFailed
            }
        }
    }
}
