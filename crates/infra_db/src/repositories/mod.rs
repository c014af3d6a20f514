//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and domain
//! types. Queries are built at runtime with `sqlx::query_as` so the crate
//! compiles without a live database.

pub mod sources;
pub mod snapshot;

pub use sources::SourceRepository;
pub use snapshot::SnapshotRepository;
