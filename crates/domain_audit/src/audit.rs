//! Audit rows
//!
//! Joins each resolved [`Claim`] with its [`ClaimFinancialSummary`] into one
//! [`ClaimAudit`] and derives settlement duration, net variance and the
//! exception flag. Rows are rebuilt wholesale on every run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

use core_kernel::{
    days_between, AppointmentId, ClaimId, DepartmentId, Money, PatientId, PayerId, ProviderId,
};
use domain_billing::ClaimFinancialSummary;
use domain_claims::{Claim, ClaimStatus};

use crate::error::AuditError;
use crate::exception::{classify, ExceptionFlag};

/// One audit-ready row per claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAudit {
    pub claim_id: ClaimId,
    pub patient_id: Option<PatientId>,
    pub provider_id: Option<ProviderId>,
    pub supervising_provider_id: Option<ProviderId>,
    pub department_id: Option<DepartmentId>,
    pub appointment_id: Option<AppointmentId>,
    pub primary_payer_id: Option<PayerId>,
    pub secondary_payer_id: Option<PayerId>,
    pub service_date: Option<NaiveDate>,
    pub claim_status: ClaimStatus,
    pub claim_type: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub diagnosis_codes: Vec<String>,
    pub outstanding_balance: Option<Money>,

    pub total_charges: Money,
    pub total_payments: Money,
    pub total_adjustments: Money,
    pub total_transfers: Money,
    pub total_transfers_in: Money,
    pub total_transfers_out: Money,
    pub transaction_count: usize,
    pub first_transaction_date: Option<NaiveDate>,
    pub last_transaction_date: Option<NaiveDate>,

    /// Days from service to the last financial activity
    pub settlement_days: Option<i64>,
    /// Payments minus charges
    pub net_variance: Money,
    pub exception_flag: ExceptionFlag,
}

impl ClaimAudit {
    /// Builds the audit row for one claim
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Calculation`] if charges and payments are in
    /// different currencies.
    pub fn derive(claim: &Claim, summary: &ClaimFinancialSummary) -> Result<Self, AuditError> {
        let net_variance = summary.total_payments.checked_sub(&summary.total_charges)?;
        let settlement_days = match (claim.service_date, summary.last_transaction_date) {
            (Some(service), Some(last)) => Some(days_between(service, last)),
            _ => None,
        };

        Ok(Self {
            claim_id: claim.claim_id.clone(),
            patient_id: claim.patient_id.clone(),
            provider_id: claim.provider_id.clone(),
            supervising_provider_id: claim.supervising_provider_id.clone(),
            department_id: claim.department_id.clone(),
            appointment_id: claim.appointment_id.clone(),
            primary_payer_id: claim.primary_payer_id.clone(),
            secondary_payer_id: claim.secondary_payer_id.clone(),
            service_date: claim.service_date,
            claim_status: claim.claim_status,
            claim_type: claim.claim_type.clone(),
            primary_diagnosis: claim.primary_diagnosis().map(str::to_string),
            diagnosis_codes: claim.diagnosis_codes.clone(),
            outstanding_balance: claim.outstanding_balance,
            total_charges: summary.total_charges,
            total_payments: summary.total_payments,
            total_adjustments: summary.total_adjustments,
            total_transfers: summary.total_transfers,
            total_transfers_in: summary.total_transfers_in,
            total_transfers_out: summary.total_transfers_out,
            transaction_count: summary.transaction_count,
            first_transaction_date: summary.first_transaction_date,
            last_transaction_date: summary.last_transaction_date,
            settlement_days,
            net_variance,
            exception_flag: classify(&summary.total_charges, &summary.total_payments),
        })
    }
}

/// Counters describing one audit build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub audited_claims: usize,
    /// Claims excluded because no financial summary exists for them
    pub integrity_violations: usize,
    /// Summaries whose claim is not in the resolved set
    pub summaries_without_claim: usize,
    pub exceptions: BTreeMap<ExceptionFlag, usize>,
}

/// Output of an audit build: rows ordered by claim id plus counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditBuild {
    pub rows: Vec<ClaimAudit>,
    pub report: AuditReport,
}

/// Builds the complete audit relation
///
/// Claims without a summary are integrity violations: they are logged,
/// counted and left out rather than defaulted. Summaries without a claim
/// are counted and left out.
#[instrument(skip_all, fields(claims = claims.len(), summaries = summaries.len()))]
pub fn build_audits(
    claims: &BTreeMap<ClaimId, Claim>,
    summaries: &BTreeMap<ClaimId, ClaimFinancialSummary>,
) -> Result<AuditBuild, AuditError> {
    let mut report = AuditReport::default();
    let mut rows = Vec::with_capacity(claims.len());

    for (claim_id, claim) in claims {
        let Some(summary) = summaries.get(claim_id) else {
            error!(%claim_id, "Claim has no financial summary, excluding from audit");
            report.integrity_violations += 1;
            continue;
        };
        let row = ClaimAudit::derive(claim, summary)?;
        *report.exceptions.entry(row.exception_flag).or_default() += 1;
        rows.push(row);
    }

    report.summaries_without_claim = summaries
        .keys()
        .filter(|claim_id| !claims.contains_key(*claim_id))
        .count();
    if report.summaries_without_claim > 0 {
        warn!(
            count = report.summaries_without_claim,
            "Financial summaries reference claims outside the resolved set"
        );
    }

    report.audited_claims = rows.len();
    info!(
        audited = report.audited_claims,
        integrity_violations = report.integrity_violations,
        "Audit relation built"
    );
    Ok(AuditBuild { rows, report })
}
