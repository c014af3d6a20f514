//! Port Adapters
//!
//! PostgreSQL implementations of the pipeline's ports.
//!
//! - [`PostgresSourceAdapter`]: claim, transaction and payer sources over
//!   the raw source tables
//! - [`PostgresPipelineStore`]: fact state, atomic publication and the
//!   audit read side
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresPipelineStore, PostgresSourceAdapter};
//!
//! let store = PostgresPipelineStore::new(pool.clone());
//! let rows = store.audits(&AuditQuery::all()).await?;
//! ```

pub mod sources;
pub mod store;

pub use sources::PostgresSourceAdapter;
pub use store::PostgresPipelineStore;
