//! Integration tests for the transcript reconciliation pass
//!
//! The collaborator is scripted: each transcript carries a marker word and
//! the reply for that marker is fixed up front.

use async_trait::async_trait;
use fuze_common::store::SqliteStore;
use fuze_common::{Error, ExtractionStatus, SubmissionFields, SubmissionStore};
use fuze_portal::collaborator::{ChatRequest, Collaborator, CollaboratorError};
use fuze_portal::extraction::{Outcome, ReconcileOptions, ReconcileReport, Reconciler};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// Replies keyed by a marker found in the prompt; records every call
struct ScriptedCollaborator {
    script: Vec<(&'static str, Reply)>,
    calls: Mutex<Vec<(&'static str, Instant)>>,
}

impl ScriptedCollaborator {
    fn new(script: Vec<(&'static str, Reply)>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Collaborator for ScriptedCollaborator {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CollaboratorError> {
        let prompt = &request.messages.last().expect("user message").content;
        let (marker, reply) = self
            .script
            .iter()
            .find(|(marker, _)| prompt.contains(&format!("[{}]", marker)))
            .expect("prompt should carry a scripted marker");

        self.calls.lock().unwrap().push((*marker, Instant::now()));
        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail => Err(CollaboratorError::Upstream {
                status: 503,
                body: "overloaded".to_string(),
            }),
        }
    }
}

/// Deletes every submission it is asked about, then replies normally
struct DeletingCollaborator {
    store: Arc<dyn SubmissionStore>,
}

#[async_trait]
impl Collaborator for DeletingCollaborator {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, CollaboratorError> {
        for submission in self.store.list().await.unwrap() {
            self.store.delete(submission.id).await.unwrap();
        }
        Ok(r#"{"company_name": "Too Late Inc"}"#.to_string())
    }
}

async fn setup_store() -> (TempDir, Arc<dyn SubmissionStore>) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&dir.path().join("reconcile.db")).await.unwrap();
    (dir, Arc::new(store))
}

/// Transcript long enough to qualify, tagged with `marker`
fn transcript(marker: &str) -> String {
    format!(
        "[{}] assistant: Tell me about your technology. user: {}",
        marker,
        "We build a compact directed-energy counter-UAS system. ".repeat(3)
    )
}

async fn create_raw(store: &Arc<dyn SubmissionStore>, marker: &str) -> i64 {
    let fields = SubmissionFields {
        conversation_transcript: Some(Some(transcript(marker))),
        ..Default::default()
    };
    store.create(&fields).await.unwrap()
}

fn reply_for(company: &str) -> Reply {
    Reply::Text(format!(
        r#"{{"company_name": "{}", "trl_level": 6, "capability_score": 7.5, "recommendation": "Moderate Fit"}}"#,
        company
    ))
}

fn fast_options() -> ReconcileOptions {
    ReconcileOptions {
        interval: Duration::ZERO,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_malformed_reply_is_skipped_and_batch_continues() {
    let (_dir, store) = setup_store().await;
    let first = create_raw(&store, "ALPHA").await;
    let second = create_raw(&store, "BRAVO").await;
    let third = create_raw(&store, "CHARLIE").await;

    let collaborator = Arc::new(ScriptedCollaborator::new(vec![
        ("ALPHA", reply_for("Alpha Optics")),
        ("BRAVO", Reply::Text("Sorry, I could not find any details.".to_string())),
        ("CHARLIE", Reply::Text(format!("```json\n{}\n```", r#"{"company_name": "Charlie Dynamics"}"#))),
    ]));
    let reconciler = Reconciler::new(Arc::clone(&store), collaborator.clone(), fast_options());

    let report = reconciler.run().await.unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            candidates: 3,
            extracted: 2,
            malformed: 1,
            ..Default::default()
        }
    );
    assert!(!report.is_complete());
    assert_eq!(collaborator.call_count(), 3);

    let alpha = store.get(first).await.unwrap().unwrap();
    assert_eq!(alpha.company_name.as_deref(), Some("Alpha Optics"));
    assert_eq!(alpha.trl_level, Some(6));
    assert_eq!(alpha.capability_score, Some(7.5));
    assert_eq!(alpha.extraction_status, Some(ExtractionStatus::Extracted));
    // Transcript is never overwritten by the reply
    assert_eq!(alpha.conversation_transcript, Some(transcript("ALPHA")));

    let bravo = store.get(second).await.unwrap().unwrap();
    assert_eq!(bravo.company_name, None);
    assert_eq!(bravo.extraction_status, Some(ExtractionStatus::ExtractionFailed));

    let charlie = store.get(third).await.unwrap().unwrap();
    assert_eq!(charlie.company_name.as_deref(), Some("Charlie Dynamics"));
    assert_eq!(charlie.extraction_status, Some(ExtractionStatus::Extracted));

    // Nothing left to do; failed records wait for --retry-failed
    assert!(reconciler.candidates().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_selection() {
    let (_dir, store) = setup_store().await;

    let eligible = create_raw(&store, "ELIGIBLE").await;

    // Too short to be worth extracting
    store
        .create(&SubmissionFields {
            conversation_transcript: Some(Some("user: hi".to_string())),
            ..Default::default()
        })
        .await
        .unwrap();

    // Already has a company name
    store
        .create(&SubmissionFields {
            company_name: Some(Some("Filled In LLC".to_string())),
            conversation_transcript: Some(Some(transcript("FILLED"))),
            ..Default::default()
        })
        .await
        .unwrap();

    // Whitespace company name still counts as missing
    let blank_name = store
        .create(&SubmissionFields {
            company_name: Some(Some("   ".to_string())),
            conversation_transcript: Some(Some(transcript("BLANK"))),
            ..Default::default()
        })
        .await
        .unwrap();

    let failed = create_raw(&store, "FAILED").await;
    store
        .update(failed, &SubmissionFields::default().with_extraction_status(ExtractionStatus::ExtractionFailed))
        .await
        .unwrap();

    let done = create_raw(&store, "DONE").await;
    store
        .update(done, &SubmissionFields::default().with_extraction_status(ExtractionStatus::Extracted))
        .await
        .unwrap();

    let collaborator: Arc<dyn Collaborator> = Arc::new(ScriptedCollaborator::new(vec![]));

    let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&collaborator), fast_options());
    let mut ids: Vec<i64> = reconciler.candidates().await.unwrap().iter().map(|s| s.id).collect();
    ids.sort();
    assert_eq!(ids, vec![eligible, blank_name]);

    let retrying = Reconciler::new(
        Arc::clone(&store),
        collaborator,
        ReconcileOptions {
            retry_failed: true,
            ..fast_options()
        },
    );
    let mut ids: Vec<i64> = retrying.candidates().await.unwrap().iter().map(|s| s.id).collect();
    ids.sort();
    assert_eq!(ids, vec![eligible, blank_name, failed]);
}

#[tokio::test]
async fn test_collaborator_failure_leaves_record_untouched() {
    let (_dir, store) = setup_store().await;
    let id = create_raw(&store, "DOWN").await;
    let before = store.get(id).await.unwrap().unwrap();

    let collaborator = Arc::new(ScriptedCollaborator::new(vec![("DOWN", Reply::Fail)]));
    let reconciler = Reconciler::new(Arc::clone(&store), collaborator, fast_options());

    let report = reconciler.run().await.unwrap();
    assert_eq!(report.collaborator_failures, 1);
    assert_eq!(report.failures(), 1);
    assert!(!report.is_complete());

    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after, before);

    // Still eligible for the next run
    assert_eq!(reconciler.candidates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_record_deleted_mid_pass_is_reported() {
    let (_dir, store) = setup_store().await;
    create_raw(&store, "GONE").await;

    let collaborator = Arc::new(DeletingCollaborator {
        store: Arc::clone(&store),
    });
    let reconciler = Reconciler::new(Arc::clone(&store), collaborator, fast_options());

    let report = reconciler.run().await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.vanished, 1);
    assert_eq!(report.extracted, 0);
    // A deleted record is nothing left to retry
    assert!(report.is_complete());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_by_id() {
    let (_dir, store) = setup_store().await;

    // Has a company name, so the batch rule would skip it
    let id = store
        .create(&SubmissionFields {
            company_name: Some(Some("Old Name".to_string())),
            conversation_transcript: Some(Some(transcript("SINGLE"))),
            ..Default::default()
        })
        .await
        .unwrap();
    let no_transcript = store.create(&SubmissionFields::default()).await.unwrap();

    let collaborator = Arc::new(ScriptedCollaborator::new(vec![("SINGLE", reply_for("New Name"))]));
    let reconciler = Reconciler::new(Arc::clone(&store), collaborator, fast_options());

    assert_eq!(reconciler.extract_by_id(id).await.unwrap(), Outcome::Extracted);
    let submission = store.get(id).await.unwrap().unwrap();
    assert_eq!(submission.company_name.as_deref(), Some("New Name"));

    assert!(matches!(
        reconciler.extract_by_id(9999).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        reconciler.extract_by_id(no_transcript).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_calls_are_spaced_by_interval() {
    let (_dir, store) = setup_store().await;
    for marker in ["ONE", "TWO", "THREE"] {
        create_raw(&store, marker).await;
    }

    let collaborator = Arc::new(ScriptedCollaborator::new(vec![
        ("ONE", reply_for("One")),
        ("TWO", reply_for("Two")),
        ("THREE", reply_for("Three")),
    ]));
    let interval = Duration::from_millis(100);
    let reconciler = Reconciler::new(
        Arc::clone(&store),
        collaborator.clone(),
        ReconcileOptions {
            interval,
            ..Default::default()
        },
    );

    let report = reconciler.run().await.unwrap();
    assert_eq!(report.extracted, 3);

    let times = collaborator.call_times();
    assert_eq!(times.len(), 3);
    let total = times[2].duration_since(times[0]);
    // Small allowance for limiter clock granularity
    assert!(
        total >= interval * 2 - Duration::from_millis(10),
        "calls were only {:?} apart",
        total
    );
}

#[tokio::test]
async fn test_concurrent_pass_processes_everything() {
    let (_dir, store) = setup_store().await;
    let markers = ["P1", "P2", "P3", "P4", "P5"];
    for marker in markers {
        create_raw(&store, marker).await;
    }

    let script = markers.iter().map(|m| (*m, reply_for(m))).collect();
    let collaborator = Arc::new(ScriptedCollaborator::new(script));
    let reconciler = Reconciler::new(
        Arc::clone(&store),
        collaborator.clone(),
        ReconcileOptions {
            concurrency: 3,
            ..fast_options()
        },
    );

    let report = reconciler.run().await.unwrap();
    assert_eq!(report.candidates, 5);
    assert_eq!(report.extracted, 5);
    assert_eq!(collaborator.call_count(), 5);
    assert!(store
        .list()
        .await
        .unwrap()
        .iter()
        .all(|s| s.extraction_status == Some(ExtractionStatus::Extracted)));
}
