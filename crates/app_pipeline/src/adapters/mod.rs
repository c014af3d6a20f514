//! Adapters for the pipeline ports
//!
//! - [`memory`]: in-memory store and reader for tests and local runs
//! - [`json_lines`]: file sources, one JSON object per line
//! - [`snapshot_file`]: store that persists the published snapshot to a
//!   single JSON file, replaced atomically on commit
//!
//! The PostgreSQL adapters live in `infra_db`.

pub mod snapshot;
pub mod memory;
pub mod json_lines;
pub mod snapshot_file;

pub use snapshot::PublishedSnapshot;
pub use memory::InMemoryPipelineStore;
pub use json_lines::{JsonLinesClaimSource, JsonLinesPayerSource, JsonLinesTransactionSource};
pub use snapshot_file::JsonSnapshotStore;
