//! PostgreSQL Pipeline Store
//!
//! Carries pipeline state between runs and serves the published snapshot.
//! A commit is one database transaction; a failed or stale run leaves every
//! table as the previous run left it.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use app_pipeline::{AuditReader, AuditView, FactState, PipelineStore, RunCommit, RunReport};
use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_claims::Payer;

use crate::repositories::SnapshotRepository;

const ADAPTER_ID: &str = "postgres-pipeline-store";

/// PostgreSQL-backed [`PipelineStore`] and [`AuditReader`]
#[derive(Debug, Clone)]
pub struct PostgresPipelineStore {
    repository: SnapshotRepository,
}

impl PostgresPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SnapshotRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &SnapshotRepository {
        &self.repository
    }
}

impl DomainPort for PostgresPipelineStore {}

#[async_trait]
impl HealthCheckable for PostgresPipelineStore {
    async fn health_check(&self) -> HealthCheckResult {
        match self.repository.ping().await {
            Ok(()) => HealthCheckResult::healthy(ADAPTER_ID),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl PipelineStore for PostgresPipelineStore {
    #[instrument(skip(self))]
    async fn load_state(&self) -> Result<FactState, PortError> {
        let state = self.repository.load_state().await?;
        debug!(
            facts = state.facts.len(),
            orphans = state.orphans.len(),
            claims = state.claim_records.len(),
            base_run = ?state.base_run,
            "Loaded pipeline state"
        );
        Ok(state)
    }

    async fn commit(&self, commit: RunCommit) -> Result<(), PortError> {
        self.repository.publish(&commit).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditReader for PostgresPipelineStore {
    async fn audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError> {
        Ok(self.repository.find_audits(query).await?)
    }

    async fn audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, PortError> {
        Ok(self.repository.find_audit(claim_id).await?)
    }

    async fn payers(&self) -> Result<Vec<Payer>, PortError> {
        Ok(self.repository.published_payers().await?)
    }

    async fn latest_run(&self) -> Result<Option<RunReport>, PortError> {
        Ok(self.repository.latest_run().await?)
    }

    async fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError> {
        Ok(self.repository.read_view(query).await?)
    }
}
