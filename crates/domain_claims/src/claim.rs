//! Normalized claim context

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{
    AppointmentId, ClaimId, DepartmentId, Money, PatientId, PayerId, ProviderId,
};

/// Claim status after normalization
///
/// Source systems use many spellings for the same lifecycle state. Anything
/// that cannot be mapped lands in [`ClaimStatus::Unknown`] instead of
/// failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Created, not yet billed
    Open,
    /// Submitted to a payer
    Billed,
    /// Awaiting payer response
    Pending,
    /// Settled and closed
    Closed,
    /// Rejected by the payer
    Denied,
    /// Source status could not be mapped
    Unknown,
}

impl ClaimStatus {
    /// Maps a source status string onto the fixed enum
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ClaimStatus::Unknown;
        };
        let key: String = raw
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();

        match key.as_str() {
            "OPEN" | "NEW" | "CREATED" => ClaimStatus::Open,
            "BILLED" | "SUBMITTED" => ClaimStatus::Billed,
            "PENDING" | "IN_PROCESS" | "IN_PROGRESS" => ClaimStatus::Pending,
            "CLOSED" | "PAID" | "SETTLED" => ClaimStatus::Closed,
            "DENIED" | "REJECTED" => ClaimStatus::Denied,
            _ => ClaimStatus::Unknown,
        }
    }

    /// Returns the canonical code
    pub fn code(&self) -> &'static str {
        match self {
            ClaimStatus::Open => "OPEN",
            ClaimStatus::Billed => "BILLED",
            ClaimStatus::Pending => "PENDING",
            ClaimStatus::Closed => "CLOSED",
            ClaimStatus::Denied => "DENIED",
            ClaimStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One normalized claim, unique by `claim_id`
///
/// Financial fields on the claim are informational only: totals are always
/// derived from the transaction fact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub patient_id: Option<PatientId>,
    pub provider_id: Option<ProviderId>,
    pub supervising_provider_id: Option<ProviderId>,
    pub department_id: Option<DepartmentId>,
    pub appointment_id: Option<AppointmentId>,
    /// `None` when the source payer does not resolve against the dimension
    pub primary_payer_id: Option<PayerId>,
    pub secondary_payer_id: Option<PayerId>,
    pub service_date: Option<NaiveDate>,
    pub claim_status: ClaimStatus,
    pub claim_type: Option<String>,
    /// Balance as reported by the source system
    pub outstanding_balance: Option<Money>,
    pub diagnosis_codes: Vec<String>,
}

impl Claim {
    /// Creates a claim with only its identifier set
    pub fn new(claim_id: ClaimId) -> Self {
        Self {
            claim_id,
            patient_id: None,
            provider_id: None,
            supervising_provider_id: None,
            department_id: None,
            appointment_id: None,
            primary_payer_id: None,
            secondary_payer_id: None,
            service_date: None,
            claim_status: ClaimStatus::Unknown,
            claim_type: None,
            outstanding_balance: None,
            diagnosis_codes: Vec::new(),
        }
    }

    /// First diagnosis code, if any
    pub fn primary_diagnosis(&self) -> Option<&str> {
        self.diagnosis_codes.first().map(String::as_str)
    }

    /// True when the claim has no resolved primary payer
    pub fn has_unassigned_payer(&self) -> bool {
        self.primary_payer_id.is_none()
    }
}
