//! Pipeline errors
//!
//! Any of these aborts the run before commit, so the previously published
//! snapshot stays active.

use thiserror::Error;

use core_kernel::PortError;
use domain_audit::AuditError;
use domain_billing::BillingError;
use domain_claims::ClaimError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// An ingestion source failed to deliver its batch
    #[error("Source {source_name} failed: {error}")]
    Source {
        source_name: &'static str,
        #[source]
        error: PortError,
    },

    /// The store could not load state or commit the run
    #[error("Store failed: {0}")]
    Store(#[source] PortError),

    /// The payer dimension is inconsistent
    #[error("Claims context error: {0}")]
    Claims(#[from] ClaimError),

    #[error("Aggregation error: {0}")]
    Billing(#[from] BillingError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn source_failed(source_name: &'static str, error: PortError) -> Self {
        PipelineError::Source { source_name, error }
    }

    /// Returns true if retrying the run later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Source { error, .. } | PipelineError::Store(error) => error.is_transient(),
            _ => false,
        }
    }
}
