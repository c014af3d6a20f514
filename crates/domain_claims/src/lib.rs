//! Claims Context Domain
//!
//! This crate turns raw claim records from a source system into one stable,
//! normalized [`Claim`] per claim id, and owns the payer dimension that
//! consumers join at read time.
//!
//! # Resolution
//!
//! ```text
//! raw records -> drop malformed -> latest record per claim_id
//!             -> normalize status -> resolve payers -> Claim
//! ```

pub mod claim;
pub mod payer;
pub mod source;
pub mod resolver;
pub mod ports;
pub mod error;

pub use claim::{Claim, ClaimStatus};
pub use payer::{Payer, PayerDimension, UNKNOWN_PAYER_NAME};
pub use source::RawClaimRecord;
pub use resolver::{ClaimsContextResolver, ResolvedClaims, ResolutionReport};
pub use ports::{ClaimSource, PayerSource};
pub use error::ClaimError;
