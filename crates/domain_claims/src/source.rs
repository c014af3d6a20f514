//! Raw claim records as delivered by a source system
//!
//! Every field is optional text: the source schema is an external contract
//! and validation happens in the resolver, not at decode time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::temporal::parse_source_timestamp;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawClaimRecord {
    pub claim_id: Option<String>,
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
    pub supervising_provider_id: Option<String>,
    pub department_id: Option<String>,
    pub appointment_id: Option<String>,
    pub primary_payer_id: Option<String>,
    pub secondary_payer_id: Option<String>,
    pub service_date: Option<String>,
    pub claim_status: Option<String>,
    pub claim_type: Option<String>,
    pub outstanding_balance: Option<String>,
    pub diagnosis_codes: Vec<String>,
    /// When the source last modified the record
    pub updated_at: Option<String>,
    /// Monotonic ingest sequence assigned by the source feed
    pub ingest_sequence: Option<u64>,
}

impl RawClaimRecord {
    /// Creates a record carrying only a claim id
    pub fn with_claim_id(claim_id: impl Into<String>) -> Self {
        Self {
            claim_id: Some(claim_id.into()),
            ..Self::default()
        }
    }

    /// Parsed update timestamp; unparseable values count as absent
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|raw| parse_source_timestamp(raw).ok())
    }

    /// Recency key used to pick the winning record for a claim id
    ///
    /// Absent values sort first, so a record with a timestamp always beats
    /// one without.
    pub fn recency(&self) -> (Option<DateTime<Utc>>, Option<u64>) {
        (self.updated_at_utc(), self.ingest_sequence)
    }
}
