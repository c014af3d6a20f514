//! Audit row and payer handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use core_kernel::ClaimId;
use domain_audit::ClaimAudit;
use domain_claims::Payer;

use crate::dto::{AuditListResponse, AuditQueryParams};
use crate::{error::ApiError, AppState};

/// Lists audit rows matching the query string
pub async fn list_audits(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditListResponse>, ApiError> {
    let query = params.into_query()?;
    let rows = state.reader.audits(&query).await?;
    debug!(rows = rows.len(), "Audit rows listed");
    Ok(Json(AuditListResponse::from(rows)))
}

/// Gets the audit row of one claim
pub async fn get_audit(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<ClaimAudit>, ApiError> {
    let claim_id = ClaimId::new(&claim_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state
        .reader
        .audit(&claim_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No audit row for claim {claim_id}")))
}

/// Lists the payer dimension of the published run
pub async fn list_payers(State(state): State<AppState>) -> Result<Json<Vec<Payer>>, ApiError> {
    Ok(Json(state.reader.payers().await?))
}
