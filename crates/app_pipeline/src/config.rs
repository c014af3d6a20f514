//! Pipeline configuration
//!
//! Loaded from `PIPELINE_` prefixed environment variables (a `.env` file is
//! read first when present) and passed explicitly to the binary that wires
//! sources and stores together.

use serde::Deserialize;
use std::path::PathBuf;

use core_kernel::Currency;

use crate::error::PipelineError;

/// Where raw claims, transactions and payers are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    JsonLines,
    Postgres,
}

/// Where fact-store state and the published snapshot live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    SnapshotFile,
    Postgres,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Currency every amount is aggregated in
    pub currency: Currency,
    pub source: SourceKind,
    pub store: StoreKind,
    /// JSON-lines file of raw claim records
    pub claims_path: PathBuf,
    /// JSON-lines file of raw transaction records
    pub transactions_path: PathBuf,
    /// JSON-lines file of payers
    pub payers_path: PathBuf,
    /// State file used by the snapshot-file store
    pub snapshot_path: PathBuf,
    /// PostgreSQL connection string
    pub database_url: String,
    pub max_connections: u32,
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            source: SourceKind::JsonLines,
            store: StoreKind::SnapshotFile,
            claims_path: PathBuf::from("data/claims.jsonl"),
            transactions_path: PathBuf::from("data/transactions.jsonl"),
            payers_path: PathBuf::from("data/payers.jsonl"),
            snapshot_path: PathBuf::from("data/snapshot.json"),
            database_url: "postgres://localhost/claims_audit".to_string(),
            max_connections: 5,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from the environment
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let config: Self = config::Config::builder()
            .add_source(config::Environment::with_prefix("PIPELINE").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the selected source and store have what they need
    pub fn validate(&self) -> Result<(), PipelineError> {
        let needs_database =
            self.source == SourceKind::Postgres || self.store == StoreKind::Postgres;
        if needs_database && self.database_url.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "database_url is required for the postgres source or store".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(PipelineError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.source == SourceKind::JsonLines {
            for (name, path) in [
                ("claims_path", &self.claims_path),
                ("transactions_path", &self.transactions_path),
                ("payers_path", &self.payers_path),
            ] {
                if path.as_os_str().is_empty() {
                    return Err(PipelineError::Configuration(format!(
                        "{name} is required for the json_lines source"
                    )));
                }
            }
        }
        Ok(())
    }
}
