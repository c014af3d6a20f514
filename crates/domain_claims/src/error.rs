//! Claims domain errors

use thiserror::Error;

/// Errors that can occur in the claims domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Claim record has no claim_id")]
    MissingClaimId,

    #[error("Duplicate payer in dimension: {0}")]
    DuplicatePayer(String),
}
