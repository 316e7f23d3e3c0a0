//! Aggregate statistics endpoint

use axum::{extract::State, Json};
use fuze_common::Statistics;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/statistics
pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    let stats = state
        .store
        .statistics()
        .await
        .map_err(ApiError::store("Failed to fetch statistics"))?;
    Ok(Json(stats))
}
