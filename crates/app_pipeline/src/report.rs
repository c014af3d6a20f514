//! Run reports
//!
//! Every successful run publishes one [`RunReport`] alongside its snapshot.
//! It carries the counters of each stage so excluded, orphaned and
//! conflicting records are visible without digging through logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, RunId};
use domain_audit::AuditReport;
use domain_billing::IngestionReport;
use domain_claims::ResolutionReport;

use crate::runner::RunOutput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub currency: Currency,
    pub payers: usize,
    pub claims: ResolutionReport,
    pub transactions: IngestionReport,
    pub facts: usize,
    pub orphans: usize,
    pub summaries: usize,
    pub audit: AuditReport,
}

impl RunReport {
    /// Summarizes a computed run
    pub fn new(
        run_id: RunId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        currency: Currency,
        output: &RunOutput,
    ) -> Self {
        Self {
            run_id,
            started_at,
            completed_at,
            currency,
            payers: output.payers.len(),
            claims: output.resolution.clone(),
            transactions: output.ingestion.clone(),
            facts: output.facts.len(),
            orphans: output.orphans.len(),
            summaries: output.summaries.len(),
            audit: output.audit.clone(),
        }
    }

    /// Records excluded anywhere in the run
    pub fn excluded_records(&self) -> usize {
        self.claims.malformed_records
            + self.transactions.malformed
            + self.audit.integrity_violations
    }
}
