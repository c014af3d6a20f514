//! In-memory pipeline store
//!
//! Holds the published snapshot behind one lock. A commit checks its base
//! run and swaps the whole snapshot under the write lock, so readers observe
//! either the previous run or the new one.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_claims::Payer;

use crate::adapters::snapshot::PublishedSnapshot;
use crate::ports::{AuditReader, AuditView, FactState, PipelineStore, RunCommit};
use crate::report::RunReport;

#[derive(Debug, Default, Clone)]
pub struct InMemoryPipelineStore {
    snapshot: Arc<RwLock<PublishedSnapshot>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent commits fail without touching the snapshot
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// A copy of the current snapshot
    pub async fn snapshot(&self) -> PublishedSnapshot {
        self.snapshot.read().await.clone()
    }
}

impl DomainPort for InMemoryPipelineStore {}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn load_state(&self) -> Result<FactState, PortError> {
        Ok(self.snapshot.read().await.fact_state())
    }

    async fn commit(&self, commit: RunCommit) -> Result<(), PortError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "in-memory-store".to_string(),
            });
        }
        let mut current = self.snapshot.write().await;
        commit.check_base(current.run_id())?;
        *current = PublishedSnapshot::from(commit);
        Ok(())
    }
}

#[async_trait]
impl AuditReader for InMemoryPipelineStore {
    async fn audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError> {
        self.snapshot.read().await.query(query)
    }

    async fn audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, PortError> {
        Ok(self.snapshot.read().await.find(claim_id).cloned())
    }

    async fn payers(&self) -> Result<Vec<Payer>, PortError> {
        Ok(self.snapshot.read().await.payers.clone())
    }

    async fn latest_run(&self) -> Result<Option<RunReport>, PortError> {
        Ok(self.snapshot.read().await.latest_run.clone())
    }

    async fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError> {
        self.snapshot.read().await.view(query)
    }
}

#[async_trait]
impl HealthCheckable for InMemoryPipelineStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-store")
    }
}
