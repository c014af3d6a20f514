//! Pipeline Ports
//!
//! Output side of the pipeline. A [`PipelineStore`] holds the fact-store
//! state between runs and publishes a run atomically; an [`AuditReader`]
//! serves the published snapshot to consumers.
//!
//! # Atomicity
//!
//! `commit` must replace the fact state, the orphan set, the carried claim
//! records, the summaries, the audit rows, the payer snapshot and the latest
//! run report together. If it fails, none of them may change. Readers see
//! either the previous or the new snapshot, never a mix; a reader that needs
//! more than one of them goes through [`AuditReader::view`].
//!
//! # Concurrent runs
//!
//! A run commits on top of the run it loaded its state from. If another run
//! committed in between, `commit` fails with [`PortError::Conflict`] and the
//! newer snapshot stays in place.

use async_trait::async_trait;

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PortError, RunId};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_billing::Transaction;
use domain_claims::{Payer, RawClaimRecord};

use crate::report::RunReport;
use crate::runner::RunOutput;

/// State carried from one run to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactState {
    pub facts: Vec<Transaction>,
    pub orphans: Vec<Transaction>,
    /// Winning raw record per claim id
    pub claim_records: Vec<RawClaimRecord>,
    /// Run that published this state, `None` before the first run
    pub base_run: Option<RunId>,
}

/// Everything a successful run publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommit {
    pub report: RunReport,
    pub output: RunOutput,
    /// Run whose state this one was computed from
    pub base_run: Option<RunId>,
}

impl RunCommit {
    /// Fails with a conflict unless `current` is the run this commit builds on
    pub fn check_base(&self, current: Option<RunId>) -> Result<(), PortError> {
        if current == self.base_run {
            return Ok(());
        }
        let shown =
            |run: Option<RunId>| run.map_or_else(|| "none".to_string(), |id| id.to_string());
        Err(PortError::conflict(format!(
            "run {} was computed on top of run {} but the store now holds run {}",
            self.report.run_id,
            shown(self.base_run),
            shown(current)
        )))
    }
}

/// Audit rows, payers and run report read from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditView {
    pub audits: Vec<ClaimAudit>,
    pub payers: Vec<Payer>,
    pub latest_run: Option<RunReport>,
}

/// Persistence for fact-store state and published snapshots
#[async_trait]
pub trait PipelineStore: DomainPort {
    /// Loads the state left by the last successful run
    async fn load_state(&self) -> Result<FactState, PortError>;

    /// Publishes a run, all or nothing
    ///
    /// Rejects the commit with [`PortError::Conflict`] when the stored run is
    /// no longer `commit.base_run`.
    async fn commit(&self, commit: RunCommit) -> Result<(), PortError>;
}

/// Read-only access to the published snapshot
#[async_trait]
pub trait AuditReader: DomainPort + HealthCheckable {
    /// Audit rows matching the query, ordered by claim id
    async fn audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError>;

    /// The audit row of one claim
    async fn audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, PortError>;

    /// The payer dimension, ordered by payer id
    async fn payers(&self) -> Result<Vec<Payer>, PortError>;

    /// Report of the run that produced the current snapshot
    async fn latest_run(&self) -> Result<Option<RunReport>, PortError>;

    /// Matching audit rows, payers and run report, all from one snapshot
    async fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError>;
}
