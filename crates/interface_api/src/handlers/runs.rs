//! Pipeline run handlers

use axum::{extract::State, Json};

use app_pipeline::RunReport;

use crate::{error::ApiError, AppState};

/// Report of the run that produced the served snapshot
pub async fn latest_run(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    state
        .reader
        .latest_run()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No pipeline run has been published".to_string()))
}
