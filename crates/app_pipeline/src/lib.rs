//! Claims Audit Pipeline
//!
//! Orchestrates one batch run over the domain crates:
//!
//! 1. load raw claims, raw transactions, payers and the carried-over state
//!    concurrently
//! 2. merge the claim batch onto the carried claim records and resolve them
//!    against the payer dimension
//! 3. ingest transactions into the append-only fact store
//! 4. aggregate one financial summary per claim
//! 5. build one audit row per claim
//! 6. commit everything through the [`PipelineStore`] as one unit
//!
//! A failure at any step leaves the previously published snapshot active,
//! and so does losing a commit race against a concurrent run.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(InMemoryPipelineStore::new());
//! let runner = PipelineRunner::new(claims, transactions, payers, store.clone(), Currency::USD);
//! let report = runner.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod ports;
pub mod report;
pub mod runner;
pub mod adapters;
pub mod telemetry;

pub use config::{PipelineConfig, SourceKind, StoreKind};
pub use error::PipelineError;
pub use ports::{AuditReader, AuditView, FactState, PipelineStore, RunCommit};
pub use report::RunReport;
pub use runner::{execute, PipelineRunner, RunOutput, SourceBatch};
