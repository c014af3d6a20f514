//! The published snapshot shared by the in-memory and file stores

use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, PortError, RunId};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_billing::{ClaimFinancialSummary, Transaction};
use domain_claims::{Payer, PayerDimension, RawClaimRecord};

use crate::ports::{AuditView, FactState, RunCommit};
use crate::report::RunReport;

/// Complete output of the last successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedSnapshot {
    pub facts: Vec<Transaction>,
    pub orphans: Vec<Transaction>,
    #[serde(default)]
    pub claim_records: Vec<RawClaimRecord>,
    pub summaries: Vec<ClaimFinancialSummary>,
    pub audits: Vec<ClaimAudit>,
    pub payers: Vec<Payer>,
    pub latest_run: Option<RunReport>,
}

impl From<RunCommit> for PublishedSnapshot {
    fn from(commit: RunCommit) -> Self {
        let output = commit.output;
        Self {
            facts: output.facts,
            orphans: output.orphans,
            claim_records: output.claim_records,
            summaries: output.summaries,
            audits: output.audits,
            payers: output.payers,
            latest_run: Some(commit.report),
        }
    }
}

impl PublishedSnapshot {
    /// State to carry into the next run
    pub fn fact_state(&self) -> FactState {
        FactState {
            facts: self.facts.clone(),
            orphans: self.orphans.clone(),
            claim_records: self.claim_records.clone(),
            base_run: self.run_id(),
        }
    }

    /// Run that published this snapshot
    pub fn run_id(&self) -> Option<RunId> {
        self.latest_run.as_ref().map(|report| report.run_id)
    }

    pub fn payer_dimension(&self) -> Result<PayerDimension, PortError> {
        PayerDimension::from_payers(self.payers.iter().cloned())
            .map_err(|e| PortError::internal(format!("published payer dimension is invalid: {e}")))
    }

    /// Audit rows matching the query
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError> {
        let payers = self.payer_dimension()?;
        Ok(query
            .apply(&self.audits, &payers)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Matching rows together with the payers and run they belong to
    pub fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError> {
        Ok(AuditView {
            audits: self.query(query)?,
            payers: self.payers.clone(),
            latest_run: self.latest_run.clone(),
        })
    }

    /// Audit row of one claim; rows are ordered by claim id
    pub fn find(&self, claim_id: &ClaimId) -> Option<&ClaimAudit> {
        self.audits
            .binary_search_by(|row| row.claim_id.cmp(claim_id))
            .ok()
            .and_then(|index| self.audits.get(index))
    }
}
