//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the claims audit pipeline. The
//! fixtures are consistent and predictable so expected totals can be
//! written down by hand.

use core_kernel::{ClaimId, PayerId};
use domain_billing::RawTransactionRecord;
use domain_claims::{Payer, RawClaimRecord};

use crate::builders::{RawClaimBuilder, RawTransactionBuilder};

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn claim_id(value: &str) -> ClaimId {
        ClaimId::new(value).expect("non-blank claim id")
    }

    pub fn payer_id(value: &str) -> PayerId {
        PayerId::new(value).expect("non-blank payer id")
    }
}

/// Fixture for the payer dimension
pub struct PayerFixtures;

impl PayerFixtures {
    pub fn medicare() -> Payer {
        Payer::new(IdFixtures::payer_id("MCR"), "Medicare").with_metadata("plan_type", "Government")
    }

    pub fn aetna() -> Payer {
        Payer::new(IdFixtures::payer_id("AET"), "Aetna").with_metadata("plan_type", "Commercial")
    }

    /// Medicare and Aetna
    pub fn standard() -> Vec<Payer> {
        vec![Self::medicare(), Self::aetna()]
    }
}

/// A small source extract covering every exception flag
///
/// | claim | payer | charges | payments | flag      |
/// |-------|-------|---------|----------|-----------|
/// | C1    | MCR   | 100     | 80       | UNDERPAID |
/// | C2    | AET   | 200     | 250      | OVERPAID  |
/// | C3    | GONE  | 0       | 0        | NO_CHARGE |
/// | C4    | MCR   | 50      | 0        | ZERO_PAY  |
/// | C5    | AET   | 75      | 75       | MATCHED   |
pub struct ScenarioFixtures;

impl ScenarioFixtures {
    pub fn claims() -> Vec<RawClaimRecord> {
        vec![
            RawClaimBuilder::new("C1").payer("MCR").build(),
            RawClaimBuilder::new("C2").payer("AET").build(),
            RawClaimBuilder::new("C3").payer("GONE").service_date("2021-02-03").build(),
            RawClaimBuilder::new("C4").payer("MCR").build(),
            RawClaimBuilder::new("C5").payer("AET").build(),
        ]
    }

    pub fn transactions() -> Vec<RawTransactionRecord> {
        vec![
            RawTransactionBuilder::charge("T1", "C1", "100").on("2021-01-02").build(),
            RawTransactionBuilder::payment("T2", "C1", "60").on("2021-01-10").build(),
            RawTransactionBuilder::payment("T3", "C1", "20").on("2021-01-15").build(),
            RawTransactionBuilder::charge("T4", "C2", "200").on("2021-01-02").build(),
            RawTransactionBuilder::payment("T5", "C2", "250").on("2021-01-20").build(),
            RawTransactionBuilder::charge("T6", "C4", "50").on("2021-01-03").build(),
            RawTransactionBuilder::charge("T7", "C5", "75").on("2021-01-03").build(),
            RawTransactionBuilder::payment("T8", "C5", "75").on("2021-01-09").build(),
        ]
    }
}
