//! fuze-portal - FUZE submission intake server
//!
//! Serves the submission REST API, the statistics endpoint, the OpenAI
//! proxies, and optionally the static front end.

use anyhow::{Context, Result};
use clap::Parser;
use fuze_common::config::{DEFAULT_HOST, DEFAULT_PORT};
use fuze_common::open_store;
use fuze_portal::cli::{init_tracing, OpenAiArgs, StoreArgs};
use fuze_portal::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "fuze-portal", version, about = "FUZE submission intake portal")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    openai: OpenAiArgs,

    /// Bind address
    #[arg(long, env = "FUZE_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Directory with index.html and admin_dashboard.html
    #[arg(long, env = "FUZE_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml = cli.store.load_toml()?;

    init_tracing(&toml);
    info!(
        "Starting FUZE Submission Portal (fuze-portal) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = cli.store.store_settings(&toml)?;
    let store = open_store(&settings)
        .await
        .context("Failed to open record store")?;
    info!("✓ Record store ready ({})", store.backend_name());

    let openai = cli.openai.client(&toml)?;
    if !openai.is_configured() {
        warn!("OPENAI_API_KEY not set; /api/chat and /api/transcribe will answer 500");
    }

    let static_dir = cli.static_dir.or_else(|| toml.static_dir.clone());
    match &static_dir {
        Some(dir) => info!("Serving front end from {}", dir.display()),
        None => info!("No static directory configured; serving API only"),
    }

    let state = AppState::new(Arc::clone(&store), Arc::new(openai));
    let app = build_router(state, static_dir.as_deref());

    let host = cli
        .host
        .or_else(|| toml.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = cli.port.or(toml.port).unwrap_or(DEFAULT_PORT);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("fuze-portal listening on http://{}:{}", host, port);
    info!("Health check: http://{}:{}/health", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("fuze-portal stopped");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
