//! JSON-lines file sources
//!
//! Each file holds one JSON object per line. Blank lines are ignored. A
//! line that does not decode is skipped with a warning; field-level
//! validation is left to the pipeline stages, which count what they
//! exclude. A missing or unreadable file fails the load.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use core_kernel::{DomainPort, PortError};
use domain_billing::{RawTransactionRecord, TransactionSource};
use domain_claims::{ClaimSource, Payer, PayerSource, RawClaimRecord};

/// Reads and decodes every line of a JSON-lines file
pub async fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PortError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PortError::Connection {
            message: format!("cannot read {}", path.display()),
            source: Some(Box::new(e)),
        })?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                debug!(file = %path.display(), line = index + 1, error = %err, "Skipping undecodable line");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(file = %path.display(), skipped, "Undecodable lines skipped");
    }
    Ok(records)
}

#[derive(Debug, Clone)]
pub struct JsonLinesClaimSource {
    path: PathBuf,
}

impl JsonLinesClaimSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DomainPort for JsonLinesClaimSource {}

#[async_trait]
impl ClaimSource for JsonLinesClaimSource {
    async fn load_claims(&self) -> Result<Vec<RawClaimRecord>, PortError> {
        read_json_lines(&self.path).await
    }
}

#[derive(Debug, Clone)]
pub struct JsonLinesTransactionSource {
    path: PathBuf,
}

impl JsonLinesTransactionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DomainPort for JsonLinesTransactionSource {}

#[async_trait]
impl TransactionSource for JsonLinesTransactionSource {
    async fn load_transactions(&self) -> Result<Vec<RawTransactionRecord>, PortError> {
        read_json_lines(&self.path).await
    }
}

#[derive(Debug, Clone)]
pub struct JsonLinesPayerSource {
    path: PathBuf,
}

impl JsonLinesPayerSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DomainPort for JsonLinesPayerSource {}

#[async_trait]
impl PayerSource for JsonLinesPayerSource {
    async fn load_payers(&self) -> Result<Vec<Payer>, PortError> {
        read_json_lines(&self.path).await
    }
}
