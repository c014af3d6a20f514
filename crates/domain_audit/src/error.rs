//! Audit domain errors

use thiserror::Error;

use core_kernel::{MoneyError, TemporalError};

/// Errors that can occur while building or querying audit rows
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    /// Arithmetic on claim totals failed
    #[error("Calculation error: {0}")]
    Calculation(#[from] MoneyError),

    /// A reporting window is invalid
    #[error("Invalid date range: {0}")]
    DateRange(#[from] TemporalError),

    /// An exception flag code is not recognized
    #[error("Unknown exception flag: {0}")]
    UnknownExceptionFlag(String),
}
