//! API configuration

use serde::Deserialize;
use std::path::PathBuf;

use app_pipeline::StoreKind;
use core_kernel::Currency;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Which published snapshot to serve
    pub store: StoreKind,
    /// State file written by the pipeline's snapshot-file store
    pub snapshot_path: PathBuf,
    /// Database URL
    pub database_url: String,
    pub max_connections: u32,
    /// Currency used for reports before any run has been published
    pub currency: Currency,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            store: StoreKind::SnapshotFile,
            snapshot_path: PathBuf::from("data/snapshot.json"),
            database_url: "postgres://localhost/claims_audit".to_string(),
            max_connections: 10,
            currency: Currency::USD,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_` prefixed environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
