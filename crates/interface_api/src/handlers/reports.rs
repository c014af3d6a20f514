//! Consumer report handlers
//!
//! Every report accepts the same filters as `/audits` and is computed over
//! the matching rows of the published snapshot. Rows, payers and the run id
//! of one response always come from the same snapshot.

use axum::{
    extract::{Query, State},
    Json,
};

use core_kernel::{Currency, RunId};
use domain_audit::reporting::{
    exception_breakdown, kpi_overview, monthly_payments, payer_scorecard,
};
use domain_audit::{ClaimAudit, ExceptionCount, KpiOverview, MonthlyPayments, PayerScore};
use domain_claims::PayerDimension;

use crate::dto::{AuditQueryParams, ReportResponse, ScorecardParams};
use crate::{error::ApiError, AppState};

/// Rows and context a report is computed from
struct ReportInput {
    rows: Vec<ClaimAudit>,
    payers: PayerDimension,
    currency: Currency,
    run_id: Option<RunId>,
}

impl ReportInput {
    async fn load(state: &AppState, params: AuditQueryParams) -> Result<Self, ApiError> {
        let query = params.into_query()?;
        let view = state.reader.view(&query).await?;
        let payers = PayerDimension::from_payers(view.payers)
            .map_err(|e| ApiError::Internal(format!("Published payer dimension is invalid: {e}")))?;
        let latest = view.latest_run;

        Ok(Self {
            rows: view.audits,
            payers,
            currency: latest
                .as_ref()
                .map_or(state.config.currency, |report| report.currency),
            run_id: latest.map(|report| report.run_id),
        })
    }

    fn respond<T>(&self, data: T) -> Json<ReportResponse<T>> {
        Json(ReportResponse {
            run_id: self.run_id,
            currency: self.currency,
            data,
        })
    }
}

/// Headline KPIs
pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<ReportResponse<KpiOverview>>, ApiError> {
    let input = ReportInput::load(&state, params).await?;
    let kpis = kpi_overview(&input.rows, input.currency)?;
    Ok(input.respond(kpis))
}

/// Payer contract scorecard
///
/// `order=abs_net_variance` ranks by the size of the variance either way,
/// and `top` keeps only the first lines.
pub async fn payers(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
    Query(scorecard): Query<ScorecardParams>,
) -> Result<Json<ReportResponse<Vec<PayerScore>>>, ApiError> {
    let input = ReportInput::load(&state, params).await?;
    let mut scores = payer_scorecard(&input.rows, &input.payers, input.currency)?;
    scorecard.order.unwrap_or_default().sort(&mut scores);
    if let Some(top) = scorecard.top {
        scores.truncate(top);
    }
    Ok(input.respond(scores))
}

/// Claims per exception flag
pub async fn exceptions(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<ReportResponse<Vec<ExceptionCount>>>, ApiError> {
    let input = ReportInput::load(&state, params).await?;
    let breakdown = exception_breakdown(&input.rows);
    Ok(input.respond(breakdown))
}

/// Payments per service month and payer
pub async fn monthly(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<ReportResponse<Vec<MonthlyPayments>>>, ApiError> {
    let input = ReportInput::load(&state, params).await?;
    let trend = monthly_payments(&input.rows, &input.payers, input.currency)?;
    Ok(input.respond(trend))
}
