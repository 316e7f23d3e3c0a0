//! fuze-portal library - FUZE submission intake portal
//!
//! REST API over the record store, OpenAI proxy endpoints, and the transcript
//! extraction pass used by the `fuze-extract` binary.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use fuze_common::SubmissionStore;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod collaborator;
pub mod error;
pub mod extraction;

pub use collaborator::OpenAiClient;
pub use error::{ApiError, ApiResult};

/// Audio uploads are relayed whole; matches the transcription API's file limit
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Configured record store backend
    pub store: Arc<dyn SubmissionStore>,
    /// Client for the proxy endpoints; may be missing its API key
    pub openai: Arc<OpenAiClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<dyn SubmissionStore>, openai: Arc<OpenAiClient>) -> Self {
        Self { store, openai }
    }
}

/// Build application router
///
/// With `static_dir`, `/` serves `index.html`, `/admin` serves
/// `admin_dashboard.html`, and unmatched paths fall back to files in that
/// directory.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    use axum::routing::{get, post};

    let mut router = Router::new()
        .route(
            "/api/submissions",
            post(api::create_submission).get(api::list_submissions),
        )
        .route(
            "/api/submissions/:id",
            get(api::get_submission)
                .put(api::update_submission)
                .delete(api::delete_submission),
        )
        .route("/api/statistics", get(api::get_statistics))
        .route("/api/chat", post(api::chat))
        .route("/api/transcribe", post(api::transcribe))
        .merge(api::health_routes());

    if let Some(dir) = static_dir {
        router = router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .route_service("/admin", ServeFile::new(dir.join("admin_dashboard.html")))
            .fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
