//! Claims Audit - Pipeline Binary
//!
//! Executes one pipeline run and prints its report as JSON. The process
//! exits non-zero when the run aborts; the previously published snapshot
//! stays active in that case.
//!
//! # Usage
//!
//! ```bash
//! # JSON-lines sources, snapshot file store
//! cargo run --bin claims-pipeline
//!
//! # Everything in PostgreSQL
//! PIPELINE_SOURCE=postgres PIPELINE_STORE=postgres \
//!   PIPELINE_DATABASE_URL=postgres://... cargo run --bin claims-pipeline
//! ```
//!
//! # Environment Variables
//!
//! * `PIPELINE_CURRENCY` - Aggregation currency (default: USD)
//! * `PIPELINE_SOURCE` - `json_lines` or `postgres` (default: json_lines)
//! * `PIPELINE_STORE` - `snapshot_file` or `postgres` (default: snapshot_file)
//! * `PIPELINE_CLAIMS_PATH`, `PIPELINE_TRANSACTIONS_PATH`, `PIPELINE_PAYERS_PATH`
//! * `PIPELINE_SNAPSHOT_PATH` - Snapshot file (default: data/snapshot.json)
//! * `PIPELINE_DATABASE_URL` - PostgreSQL connection string
//! * `PIPELINE_LOG_LEVEL`, `PIPELINE_LOG_JSON`

use anyhow::Context;
use std::sync::Arc;

use app_pipeline::adapters::{
    JsonLinesClaimSource, JsonLinesPayerSource, JsonLinesTransactionSource, JsonSnapshotStore,
};
use app_pipeline::telemetry::init_tracing;
use app_pipeline::{PipelineConfig, PipelineRunner, PipelineStore, SourceKind, StoreKind};
use domain_billing::TransactionSource;
use domain_claims::{ClaimSource, PayerSource};
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, DatabasePool, PostgresPipelineStore,
    PostgresSourceAdapter,
};

type Sources = (
    Arc<dyn ClaimSource>,
    Arc<dyn TransactionSource>,
    Arc<dyn PayerSource>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    init_tracing(&config.log_level, config.log_json);

    let pool = if config.source == SourceKind::Postgres || config.store == StoreKind::Postgres {
        let pool = create_pool(
            DatabaseConfig::new(&config.database_url)
                .application_name("claims-pipeline")
                .max_connections(config.max_connections),
        )
        .await?;
        run_migrations(&pool).await?;
        Some(pool)
    } else {
        None
    };

    let (claims, transactions, payers) = open_sources(&config, pool.as_ref())?;
    let store = open_store(&config, pool.as_ref())?;

    let runner = PipelineRunner::new(claims, transactions, payers, store, config.currency);
    let report = runner.run().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn open_sources(config: &PipelineConfig, pool: Option<&DatabasePool>) -> anyhow::Result<Sources> {
    match config.source {
        SourceKind::JsonLines => {
            let claims: Arc<dyn ClaimSource> = Arc::new(JsonLinesClaimSource::new(&config.claims_path));
            let transactions: Arc<dyn TransactionSource> =
                Arc::new(JsonLinesTransactionSource::new(&config.transactions_path));
            let payers: Arc<dyn PayerSource> = Arc::new(JsonLinesPayerSource::new(&config.payers_path));
            Ok((claims, transactions, payers))
        }
        SourceKind::Postgres => {
            let pool = pool.context("Postgres source selected without a database pool")?;
            let adapter = Arc::new(PostgresSourceAdapter::new(pool.clone()));
            let claims: Arc<dyn ClaimSource> = adapter.clone();
            let transactions: Arc<dyn TransactionSource> = adapter.clone();
            let payers: Arc<dyn PayerSource> = adapter;
            Ok((claims, transactions, payers))
        }
    }
}

fn open_store(
    config: &PipelineConfig,
    pool: Option<&DatabasePool>,
) -> anyhow::Result<Arc<dyn PipelineStore>> {
    match config.store {
        StoreKind::SnapshotFile => Ok(Arc::new(JsonSnapshotStore::new(&config.snapshot_path))),
        StoreKind::Postgres => {
            let pool = pool.context("Postgres store selected without a database pool")?;
            Ok(Arc::new(PostgresPipelineStore::new(pool.clone())))
        }
    }
}
