//! Snapshot file store
//!
//! Persists the published snapshot as a single JSON document. A commit
//! writes the new document next to the old one and renames it into place,
//! so the file always holds either the previous run or the new one. Every
//! read decodes the whole document once, and commits from this process are
//! serialized and checked against the run the file currently holds.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_claims::Payer;

use crate::adapters::snapshot::PublishedSnapshot;
use crate::ports::{AuditReader, AuditView, FactState, PipelineStore, RunCommit};
use crate::report::RunReport;

#[derive(Debug)]
pub struct JsonSnapshotStore {
    path: PathBuf,
    commit_lock: Mutex<()>,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the snapshot; a missing file is an empty snapshot
    pub async fn read(&self) -> Result<PublishedSnapshot, PortError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot yet");
                return Ok(PublishedSnapshot::default());
            }
            Err(e) => {
                return Err(PortError::Connection {
                    message: format!("cannot read {}", self.path.display()),
                    source: Some(Box::new(e)),
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            PortError::transformation(format!("corrupt snapshot {}: {e}", self.path.display()))
        })
    }

    async fn write(&self, snapshot: &PublishedSnapshot) -> Result<(), PortError> {
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| PortError::transformation(format!("cannot encode snapshot: {e}")))?;
        let staging = self.staging_path();
        let io_error = |e: std::io::Error| PortError::Internal {
            message: format!("cannot write {}", self.path.display()),
            source: Some(Box::new(e)),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&staging, bytes).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(io_error)?;
        Ok(())
    }
}

impl DomainPort for JsonSnapshotStore {}

#[async_trait]
impl PipelineStore for JsonSnapshotStore {
    async fn load_state(&self) -> Result<FactState, PortError> {
        Ok(self.read().await?.fact_state())
    }

    async fn commit(&self, commit: RunCommit) -> Result<(), PortError> {
        let _guard = self.commit_lock.lock().await;
        commit.check_base(self.read().await?.run_id())?;
        let snapshot = PublishedSnapshot::from(commit);
        self.write(&snapshot).await?;
        info!(
            path = %self.path.display(),
            audits = snapshot.audits.len(),
            "Snapshot published"
        );
        Ok(())
    }
}

#[async_trait]
impl AuditReader for JsonSnapshotStore {
    async fn audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError> {
        self.read().await?.query(query)
    }

    async fn audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, PortError> {
        Ok(self.read().await?.find(claim_id).cloned())
    }

    async fn payers(&self) -> Result<Vec<Payer>, PortError> {
        Ok(self.read().await?.payers)
    }

    async fn latest_run(&self) -> Result<Option<RunReport>, PortError> {
        Ok(self.read().await?.latest_run)
    }

    async fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError> {
        self.read().await?.view(query)
    }
}

#[async_trait]
impl HealthCheckable for JsonSnapshotStore {
    async fn health_check(&self) -> HealthCheckResult {
        match self.read().await {
            Ok(_) => HealthCheckResult::healthy("snapshot-file"),
            Err(e) => HealthCheckResult::unhealthy("snapshot-file", e.to_string()),
        }
    }
}
