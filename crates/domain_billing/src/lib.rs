//! Claim Financials Domain
//!
//! This crate owns the only independently asserted state in the pipeline:
//! the append-only store of financial transactions. Everything else about a
//! claim's money is derived from it.
//!
//! # Flow
//!
//! ```text
//! raw transactions -> normalize -> fact store (or orphan hold)
//!                                      |
//!                                      v
//!                     one ClaimFinancialSummary per claim
//! ```
//!
//! # Invariants
//!
//! - A stored transaction never changes; corrections arrive as new rows
//! - Transactions for unknown claims are held, never dropped
//! - Summaries are a pure function of the stored facts

pub mod transaction;
pub mod fact_store;
pub mod summary;
pub mod ports;
pub mod error;

pub use transaction::{RawTransactionRecord, Transaction, TransactionCategory, TransactionType};
pub use fact_store::{IngestionReport, TransactionFactStore};
pub use summary::{ClaimFinancialAggregator, ClaimFinancialSummary};
pub use ports::TransactionSource;
pub use error::BillingError;
