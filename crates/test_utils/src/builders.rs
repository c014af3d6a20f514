//! Test Data Builders
//!
//! Builder patterns for raw source records. Tests set only the fields they
//! care about; everything else gets a sensible default or stays absent the
//! way a sparse source row would.

use domain_billing::{RawTransactionRecord, TransactionType};
use domain_claims::RawClaimRecord;

/// Builder for raw claim records
pub struct RawClaimBuilder {
    record: RawClaimRecord,
}

impl RawClaimBuilder {
    /// A billed claim serviced on 2021-01-01 with no payer
    pub fn new(claim_id: &str) -> Self {
        Self {
            record: RawClaimRecord {
                service_date: Some("2021-01-01".into()),
                claim_status: Some("BILLED".into()),
                ..RawClaimRecord::with_claim_id(claim_id)
            },
        }
    }

    /// Sets the primary payer id
    pub fn payer(mut self, payer_id: &str) -> Self {
        self.record.primary_payer_id = Some(payer_id.into());
        self
    }

    pub fn secondary_payer(mut self, payer_id: &str) -> Self {
        self.record.secondary_payer_id = Some(payer_id.into());
        self
    }

    /// Sets the service date as the source would deliver it
    pub fn service_date(mut self, raw: &str) -> Self {
        self.record.service_date = Some(raw.into());
        self
    }

    /// Clears the service date
    pub fn without_service_date(mut self) -> Self {
        self.record.service_date = None;
        self
    }

    pub fn status(mut self, raw: &str) -> Self {
        self.record.claim_status = Some(raw.into());
        self
    }

    pub fn patient(mut self, patient_id: &str) -> Self {
        self.record.patient_id = Some(patient_id.into());
        self
    }

    pub fn diagnoses(mut self, codes: &[&str]) -> Self {
        self.record.diagnosis_codes = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Sets the version metadata used to pick between duplicate deliveries
    pub fn version(mut self, updated_at: &str, ingest_sequence: u64) -> Self {
        self.record.updated_at = Some(updated_at.into());
        self.record.ingest_sequence = Some(ingest_sequence);
        self
    }

    pub fn build(self) -> RawClaimRecord {
        self.record
    }
}

/// Builder for raw transaction records
pub struct RawTransactionBuilder {
    record: RawTransactionRecord,
}

impl RawTransactionBuilder {
    /// A transaction of any type effective on 2021-01-02
    pub fn new(transaction_id: &str, claim_id: &str, kind: &str, amount: &str) -> Self {
        Self {
            record: RawTransactionRecord {
                transaction_id: Some(transaction_id.into()),
                claim_id: Some(claim_id.into()),
                transaction_type: Some(kind.into()),
                amount: Some(amount.into()),
                effective_date: Some("2021-01-02".into()),
                ..RawTransactionRecord::default()
            },
        }
    }

    pub fn of_type(transaction_id: &str, claim_id: &str, kind: TransactionType, amount: &str) -> Self {
        Self::new(transaction_id, claim_id, kind.code(), amount)
    }

    pub fn charge(transaction_id: &str, claim_id: &str, amount: &str) -> Self {
        Self::of_type(transaction_id, claim_id, TransactionType::Charge, amount)
    }

    pub fn payment(transaction_id: &str, claim_id: &str, amount: &str) -> Self {
        Self::of_type(transaction_id, claim_id, TransactionType::Payment, amount)
    }

    pub fn adjustment(transaction_id: &str, claim_id: &str, amount: &str) -> Self {
        Self::of_type(transaction_id, claim_id, TransactionType::Adjustment, amount)
    }

    /// Sets the effective date
    pub fn on(mut self, raw: &str) -> Self {
        self.record.effective_date = Some(raw.into());
        self
    }

    pub fn posted(mut self, raw: &str) -> Self {
        self.record.posted_date = Some(raw.into());
        self
    }

    pub fn currency(mut self, code: &str) -> Self {
        self.record.currency = Some(code.into());
        self
    }

    pub fn build(self) -> RawTransactionRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_builder_defaults() {
        let record = RawClaimBuilder::new("C1").payer("MCR").build();
        assert_eq!(record.claim_id.as_deref(), Some("C1"));
        assert_eq!(record.primary_payer_id.as_deref(), Some("MCR"));
        assert_eq!(record.service_date.as_deref(), Some("2021-01-01"));
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_transaction_builder_uses_canonical_codes() {
        let record = RawTransactionBuilder::of_type("T1", "C1", TransactionType::TransferIn, "5")
            .on("2021-01-05")
            .build();
        assert_eq!(record.transaction_type.as_deref(), Some("TRANSFER_IN"));
        assert_eq!(record.effective_date.as_deref(), Some("2021-01-05"));
    }
}
