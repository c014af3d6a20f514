//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the claims audit pipeline using SQLx.
//!
//! # Tables
//!
//! - Source tables (`raw_claims`, `raw_transactions`, `dim_payers`) hold
//!   records exactly as delivered.
//! - Pipeline state (`transaction_facts`, `transaction_orphans`,
//!   `claim_records`) is carried between runs.
//! - The published snapshot (`claim_financial_summaries`, `claims_audit`,
//!   `published_payers`, `pipeline_runs`) is rewritten by one transaction
//!   per successful run.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::{PostgresPipelineStore, PostgresSourceAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims_audit")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresPipelineStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresPipelineStore, PostgresSourceAdapter};
