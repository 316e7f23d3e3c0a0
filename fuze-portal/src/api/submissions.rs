//! Submission CRUD endpoints
//!
//! Direct pass-through to the record store. Zero changed rows and missing
//! records both answer 404.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use fuze_common::{Submission, SubmissionFields};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub message: &'static str,
    pub submission_id: i64,
}

/// An id that is not an integer can never match a record
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::submission_not_found())
}

/// Request body as a partial field set
///
/// Extraction status belongs to the reconciliation pass and is never taken
/// from clients.
fn request_fields(payload: Result<Json<SubmissionFields>, JsonRejection>) -> ApiResult<SubmissionFields> {
    let Json(fields) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(SubmissionFields {
        extraction_status: None,
        ..fields
    })
}

/// POST /api/submissions
pub async fn create_submission(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let fields = request_fields(payload)?;
    let id = state
        .store
        .create(&fields)
        .await
        .map_err(ApiError::store("Failed to save submission"))?;

    info!(id, "Submission saved");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Submission saved successfully",
            submission_id: id,
        }),
    ))
}

/// GET /api/submissions
pub async fn list_submissions(State(state): State<AppState>) -> ApiResult<Json<Vec<Submission>>> {
    let submissions = state
        .store
        .list()
        .await
        .map_err(ApiError::store("Failed to fetch submissions"))?;
    Ok(Json(submissions))
}

/// GET /api/submissions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Submission>> {
    let id = parse_id(&id)?;
    state
        .store
        .get(id)
        .await
        .map_err(ApiError::store("Failed to fetch submission"))?
        .map(Json)
        .ok_or_else(ApiError::submission_not_found)
}

/// PUT /api/submissions/:id
pub async fn update_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SubmissionFields>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    let fields = request_fields(payload)?;

    let changed = state
        .store
        .update(id, &fields)
        .await
        .map_err(ApiError::store("Failed to update submission"))?;
    if changed == 0 {
        return Err(ApiError::submission_not_found());
    }

    info!(id, "Submission updated");
    Ok(Json(MessageResponse {
        message: "Submission updated successfully",
    }))
}

/// DELETE /api/submissions/:id
pub async fn delete_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;

    let changed = state
        .store
        .delete(id)
        .await
        .map_err(ApiError::store("Failed to delete submission"))?;
    if changed == 0 {
        return Err(ApiError::submission_not_found());
    }

    info!(id, "Submission deleted");
    Ok(Json(MessageResponse {
        message: "Submission deleted successfully",
    }))
}
