//! fuze-extract - backfill structured fields from stored transcripts
//!
//! Finds submissions that carry a conversation transcript but no company
//! name, sends each transcript to the model, and writes the reply back.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fuze_common::config::{
    DEFAULT_EXTRACTION_CONCURRENCY, DEFAULT_EXTRACTION_INTERVAL_MS, DEFAULT_EXTRACTION_MODEL,
};
use fuze_common::models::MIN_TRANSCRIPT_LEN;
use fuze_common::open_store;
use fuze_portal::cli::{init_tracing, OpenAiArgs, StoreArgs};
use fuze_portal::extraction::{Outcome, ReconcileOptions, Reconciler};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "fuze-extract",
    version,
    about = "Extract structured submission fields from conversation transcripts"
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    openai: OpenAiArgs,

    /// Extract a single submission, ignoring the selection rule
    #[arg(long)]
    id: Option<i64>,

    /// List the submissions that would be processed and exit
    #[arg(long)]
    dry_run: bool,

    /// Also retry submissions whose earlier extraction reply was unusable
    #[arg(long)]
    retry_failed: bool,

    /// Chat model used for extraction
    #[arg(long, env = "FUZE_EXTRACTION_MODEL")]
    model: Option<String>,

    /// Minimum milliseconds between model calls (0 = no spacing)
    #[arg(long, env = "FUZE_EXTRACTION_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Submissions processed concurrently
    #[arg(long, env = "FUZE_EXTRACTION_CONCURRENCY")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml = cli.store.load_toml()?;

    init_tracing(&toml);
    info!(
        "Starting FUZE transcript extraction (fuze-extract) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let options = ReconcileOptions {
        model: cli
            .model
            .clone()
            .or_else(|| toml.extraction_model.clone())
            .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
        interval: Duration::from_millis(
            cli.interval_ms
                .or(toml.extraction_interval_ms)
                .unwrap_or(DEFAULT_EXTRACTION_INTERVAL_MS),
        ),
        concurrency: cli
            .concurrency
            .or(toml.extraction_concurrency)
            .unwrap_or(DEFAULT_EXTRACTION_CONCURRENCY)
            .max(1),
        retry_failed: cli.retry_failed,
        min_transcript_len: MIN_TRANSCRIPT_LEN,
    };

    let openai = cli.openai.client(&toml)?;
    if !cli.dry_run && !openai.is_configured() {
        bail!("OPENAI_API_KEY is required to run extraction");
    }

    let settings = cli.store.store_settings(&toml)?;
    let store = open_store(&settings)
        .await
        .context("Failed to open record store")?;

    let reconciler = Reconciler::new(Arc::clone(&store), Arc::new(openai), options);
    let result = run(&cli, &reconciler).await;

    store.close().await;
    result
}

async fn run(cli: &Cli, reconciler: &Reconciler) -> Result<()> {
    if cli.dry_run {
        let candidates = reconciler.candidates().await?;
        info!("{} submissions need extraction", candidates.len());
        for submission in &candidates {
            let chars = submission
                .conversation_transcript
                .as_deref()
                .map_or(0, |t| t.chars().count());
            info!(
                "  #{} created {} transcript {} chars{}",
                submission.id,
                submission.created_at.format("%Y-%m-%d %H:%M"),
                chars,
                submission
                    .extraction_status
                    .map(|s| format!(" ({})", s))
                    .unwrap_or_default()
            );
        }
        return Ok(());
    }

    if let Some(id) = cli.id {
        let outcome = reconciler.extract_by_id(id).await?;
        if outcome != Outcome::Extracted {
            bail!("Extraction of submission {} did not complete: {:?}", id, outcome);
        }
        info!("Submission {} extracted", id);
        return Ok(());
    }

    let report = reconciler.run().await?;
    if !report.is_complete() {
        bail!(
            "{} submissions were not extracted; rerun to retry (add --retry-failed for unusable replies)",
            report.failures()
        );
    }
    Ok(())
}
