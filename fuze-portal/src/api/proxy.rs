//! OpenAI proxy endpoints
//!
//! The browser front end talks to the model through these so the API key
//! never leaves the server.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Json,
};
use serde_json::Value;

use crate::collaborator::openai::DEFAULT_TRANSCRIPTION_MODEL;
use crate::collaborator::CollaboratorError;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const CHAT_FAILED: &str = "Failed to call OpenAI API";
const TRANSCRIBE_FAILED: &str = "Failed to transcribe audio";

/// POST /api/chat
///
/// Relays the request body to the chat-completions endpoint unchanged.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    if !state.openai.is_configured() {
        return Err(ApiError::collaborator(CHAT_FAILED)(CollaboratorError::NotConfigured));
    }
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let reply = state
        .openai
        .relay_chat(&body)
        .await
        .map_err(ApiError::collaborator(CHAT_FAILED))?;
    Ok(Json(reply))
}

/// POST /api/transcribe
///
/// Multipart form: `file` (required audio blob) and optional `model`.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    if !state.openai.is_configured() {
        return Err(ApiError::collaborator(TRANSCRIBE_FAILED)(CollaboratorError::NotConfigured));
    }

    let mut audio: Option<(Vec<u8>, Option<String>)> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                audio = Some((bytes.to_vec(), content_type));
            }
            Some("model") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                model = Some(text).filter(|m| !m.trim().is_empty());
            }
            _ => {}
        }
    }

    let (bytes, content_type) =
        audio.ok_or_else(|| ApiError::BadRequest("No audio file provided".to_string()))?;
    let model = model.unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string());

    let reply = state
        .openai
        .transcribe(bytes, content_type.as_deref(), &model)
        .await
        .map_err(ApiError::collaborator(TRANSCRIBE_FAILED))?;
    Ok(Json(reply))
}
