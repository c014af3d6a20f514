//! Claim financials domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur while ingesting or aggregating transactions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    /// A required field is missing or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The transaction type is not one of the known kinds
    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),

    /// The amount could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Charges and payments must not be negative
    #[error("Negative {transaction_type} amount: {amount}")]
    NegativeAmount {
        transaction_type: String,
        amount: String,
    },

    /// A date could not be parsed
    #[error("Invalid {field}: {value}")]
    InvalidDate {
        field: &'static str,
        value: String,
    },

    /// The transaction is in a currency the pipeline does not aggregate
    #[error("Unsupported currency {found}, expected {expected}")]
    UnsupportedCurrency {
        found: String,
        expected: String,
    },

    /// Arithmetic failed while summing
    #[error("Calculation error: {0}")]
    Calculation(#[from] MoneyError),
}
