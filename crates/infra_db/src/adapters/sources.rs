//! PostgreSQL Source Adapter
//!
//! Implements the three ingestion ports over the raw source tables. Raw
//! text is handed to the domain untouched; parsing and validation happen in
//! the resolver and the fact store.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresSourceAdapter;
//! use std::sync::Arc;
//!
//! let sources = Arc::new(PostgresSourceAdapter::new(pool));
//! let runner = PipelineRunner::new(sources.clone(), sources.clone(), sources, store, Currency::USD);
//! ```

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_billing::{RawTransactionRecord, TransactionSource};
use domain_claims::{ClaimSource, Payer, PayerSource, RawClaimRecord};

use crate::repositories::SourceRepository;

const ADAPTER_ID: &str = "postgres-source-adapter";

/// PostgreSQL-backed implementation of the claim, transaction and payer sources
#[derive(Debug, Clone)]
pub struct PostgresSourceAdapter {
    repository: SourceRepository,
    pool: PgPool,
}

impl PostgresSourceAdapter {
    /// Creates a new source adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SourceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &SourceRepository {
        &self.repository
    }
}

impl DomainPort for PostgresSourceAdapter {}

#[async_trait]
impl HealthCheckable for PostgresSourceAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl ClaimSource for PostgresSourceAdapter {
    #[instrument(skip(self))]
    async fn load_claims(&self) -> Result<Vec<RawClaimRecord>, PortError> {
        let rows = self.repository.load_claims().await?;
        debug!(rows = rows.len(), "Loaded raw claims");
        Ok(rows.into_iter().map(RawClaimRecord::from).collect())
    }
}

#[async_trait]
impl TransactionSource for PostgresSourceAdapter {
    #[instrument(skip(self))]
    async fn load_transactions(&self) -> Result<Vec<RawTransactionRecord>, PortError> {
        let rows = self.repository.load_transactions().await?;
        debug!(rows = rows.len(), "Loaded raw transactions");
        Ok(rows.into_iter().map(RawTransactionRecord::from).collect())
    }
}

#[async_trait]
impl PayerSource for PostgresSourceAdapter {
    #[instrument(skip(self))]
    async fn load_payers(&self) -> Result<Vec<Payer>, PortError> {
        let rows = self.repository.load_payers().await?;
        let payers = rows
            .into_iter()
            .map(|row| row.into_payer("dim_payers"))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(payers = payers.len(), "Loaded payer dimension");
        Ok(payers)
    }
}
