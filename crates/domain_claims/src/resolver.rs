//! Claims Context Resolver
//!
//! Collapses raw claim records into exactly one normalized [`Claim`] per
//! claim id. The transform is pure: the same input batch and payer
//! dimension always produce the same output.
//!
//! # Rules
//!
//! - Records without a claim id are excluded and counted.
//! - Duplicates keep the most recently updated record. Ties fall back to
//!   the highest ingest sequence, then to the record delivered last.
//! - Winning records of earlier runs compete with a new batch under the same
//!   rule, so an incremental batch only needs the claims that changed.
//! - Primary and secondary payers resolve independently. An unresolvable
//!   payer becomes `None`; the claim itself is kept.
//! - Unrecognized statuses become [`ClaimStatus::Unknown`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use core_kernel::temporal::parse_source_date;
use core_kernel::{
    AppointmentId, ClaimId, Currency, DepartmentId, Money, PatientId, PayerId, ProviderId,
};

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;
use crate::payer::PayerDimension;
use crate::source::RawClaimRecord;

/// Counters describing one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionReport {
    pub input_records: usize,
    /// Winning records carried over from earlier runs
    pub carried_records: usize,
    /// Carried records replaced by a newer record in this batch
    pub updated_claims: usize,
    pub malformed_records: usize,
    pub superseded_records: usize,
    pub resolved_claims: usize,
    pub unresolved_primary_payers: usize,
    pub unresolved_secondary_payers: usize,
    pub unknown_statuses: usize,
    pub unparseable_service_dates: usize,
    pub unparseable_balances: usize,
}

/// Output of the resolver: claims keyed and ordered by claim id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedClaims {
    pub claims: BTreeMap<ClaimId, Claim>,
    /// Winning raw record per claim, ordered by claim id
    pub records: Vec<RawClaimRecord>,
    pub report: ResolutionReport,
}

impl ResolvedClaims {
    /// Returns true if the claim id is part of the resolved set
    pub fn contains(&self, claim_id: &ClaimId) -> bool {
        self.claims.contains_key(claim_id)
    }

    pub fn get(&self, claim_id: &ClaimId) -> Option<&Claim> {
        self.claims.get(claim_id)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Normalizes raw claim records against a payer dimension
#[derive(Debug, Clone, Copy)]
pub struct ClaimsContextResolver<'a> {
    payers: &'a PayerDimension,
    currency: Currency,
}

impl<'a> ClaimsContextResolver<'a> {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `payers` - Dimension used to validate payer references
    /// * `currency` - Currency of source balances
    pub fn new(payers: &'a PayerDimension, currency: Currency) -> Self {
        Self { payers, currency }
    }

    /// Resolves a full batch of raw records
    pub fn resolve(&self, records: Vec<RawClaimRecord>) -> ResolvedClaims {
        self.resolve_onto(Vec::new(), records)
    }

    /// Resolves a batch on top of the winning records of earlier runs
    ///
    /// Carried records lose recency ties against the batch, so a redelivered
    /// record replaces its stored copy.
    #[instrument(skip_all, fields(carried = carried.len(), records = records.len()))]
    pub fn resolve_onto(
        &self,
        carried: Vec<RawClaimRecord>,
        records: Vec<RawClaimRecord>,
    ) -> ResolvedClaims {
        let mut report = ResolutionReport {
            input_records: records.len(),
            ..ResolutionReport::default()
        };

        let mut latest: BTreeMap<ClaimId, Candidate> = BTreeMap::new();
        for record in carried {
            if let Ok(claim_id) = claim_id_of(&record) {
                report.carried_records += 1;
                latest.insert(claim_id, Candidate { record, carried: true });
            }
        }

        for (position, record) in records.into_iter().enumerate() {
            let claim_id = match claim_id_of(&record) {
                Ok(id) => id,
                Err(err) => {
                    debug!(position, error = %err, "Excluding malformed claim record");
                    report.malformed_records += 1;
                    continue;
                }
            };

            let candidate = Candidate { record, carried: false };
            match latest.get(&claim_id) {
                // Later records win ties, so `>=` rather than `>`.
                Some(current) if candidate.record.recency() >= current.record.recency() => {
                    if current.carried {
                        report.updated_claims += 1;
                    } else {
                        report.superseded_records += 1;
                    }
                    latest.insert(claim_id, candidate);
                }
                Some(_) => report.superseded_records += 1,
                None => {
                    latest.insert(claim_id, candidate);
                }
            }
        }

        let mut winners = Vec::with_capacity(latest.len());
        let claims: BTreeMap<ClaimId, Claim> = latest
            .into_iter()
            .map(|(claim_id, candidate)| {
                let claim = self.normalize(claim_id.clone(), candidate.record.clone(), &mut report);
                winners.push(candidate.record);
                (claim_id, claim)
            })
            .collect();

        report.resolved_claims = claims.len();
        if report.malformed_records > 0 {
            warn!(malformed = report.malformed_records, "Claim records excluded for missing claim_id");
        }
        info!(
            resolved = report.resolved_claims,
            carried = report.carried_records,
            updated = report.updated_claims,
            superseded = report.superseded_records,
            unresolved_primary_payers = report.unresolved_primary_payers,
            "Claims context resolved"
        );

        ResolvedClaims {
            claims,
            records: winners,
            report,
        }
    }

    fn normalize(
        &self,
        claim_id: ClaimId,
        record: RawClaimRecord,
        report: &mut ResolutionReport,
    ) -> Claim {
        let claim_status = ClaimStatus::normalize(record.claim_status.as_deref());
        if claim_status == ClaimStatus::Unknown {
            report.unknown_statuses += 1;
        }

        let primary_payer_id = self.resolve_payer(&claim_id, record.primary_payer_id.as_deref());
        if primary_payer_id.is_none() && is_present(record.primary_payer_id.as_deref()) {
            report.unresolved_primary_payers += 1;
        }
        let secondary_payer_id =
            self.resolve_payer(&claim_id, record.secondary_payer_id.as_deref());
        if secondary_payer_id.is_none() && is_present(record.secondary_payer_id.as_deref()) {
            report.unresolved_secondary_payers += 1;
        }

        let service_date = record
            .service_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| {
                parse_source_date(raw)
                    .map_err(|err| {
                        debug!(%claim_id, error = %err, "Unparseable service date");
                        report.unparseable_service_dates += 1;
                    })
                    .ok()
            });

        let outstanding_balance = record
            .outstanding_balance
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| {
                Money::parse(raw, self.currency)
                    .map_err(|err| {
                        debug!(%claim_id, error = %err, "Unparseable outstanding balance");
                        report.unparseable_balances += 1;
                    })
                    .ok()
            });

        let diagnosis_codes = record
            .diagnosis_codes
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        Claim {
            patient_id: PatientId::from_optional(record.patient_id.as_deref()),
            provider_id: ProviderId::from_optional(record.provider_id.as_deref()),
            supervising_provider_id: ProviderId::from_optional(
                record.supervising_provider_id.as_deref(),
            ),
            department_id: DepartmentId::from_optional(record.department_id.as_deref()),
            appointment_id: AppointmentId::from_optional(record.appointment_id.as_deref()),
            primary_payer_id,
            secondary_payer_id,
            service_date,
            claim_status,
            claim_type: record
                .claim_type
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            outstanding_balance,
            diagnosis_codes,
            claim_id,
        }
    }

    fn resolve_payer(&self, claim_id: &ClaimId, raw: Option<&str>) -> Option<PayerId> {
        let payer_id = PayerId::from_optional(raw)?;
        if self.payers.contains(&payer_id) {
            Some(payer_id)
        } else {
            debug!(%claim_id, %payer_id, "Payer does not resolve, leaving unassigned");
            None
        }
    }
}

/// Current winner for a claim id, and whether it came from an earlier run
struct Candidate {
    record: RawClaimRecord,
    carried: bool,
}

fn claim_id_of(record: &RawClaimRecord) -> Result<ClaimId, ClaimError> {
    ClaimId::from_optional(record.claim_id.as_deref()).ok_or(ClaimError::MissingClaimId)
}

fn is_present(raw: Option<&str>) -> bool {
    raw.map_or(false, |s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payer::Payer;

    fn dimension() -> PayerDimension {
        PayerDimension::from_payers(vec![
            Payer::new(PayerId::new("P1").unwrap(), "Medicare"),
            Payer::new(PayerId::new("P2").unwrap(), "Medicaid"),
        ])
        .unwrap()
    }

    fn record(id: &str) -> RawClaimRecord {
        RawClaimRecord::with_claim_id(id)
    }

    #[test]
    fn test_missing_claim_id_is_counted_not_fatal() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);
        let mut blank = record("  ");
        blank.claim_status = Some("OPEN".into());

        let resolved = resolver.resolve(vec![RawClaimRecord::default(), blank, record("C1")]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.report.malformed_records, 2);
        assert_eq!(resolved.report.input_records, 3);
    }

    #[test]
    fn test_latest_update_wins() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut newer = record("C1");
        newer.updated_at = Some("2021-03-01T00:00:00Z".into());
        newer.claim_status = Some("CLOSED".into());
        let mut older = record("C1");
        older.updated_at = Some("2021-02-01T00:00:00Z".into());
        older.claim_status = Some("BILLED".into());

        let resolved = resolver.resolve(vec![newer, older]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.report.superseded_records, 1);
        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();
        assert_eq!(claim.claim_status, ClaimStatus::Closed);
    }

    #[test]
    fn test_sequence_breaks_timestamp_tie() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut high = record("C1");
        high.updated_at = Some("2021-03-01T00:00:00Z".into());
        high.ingest_sequence = Some(7);
        high.claim_type = Some("PROFESSIONAL".into());
        let mut low = high.clone();
        low.ingest_sequence = Some(3);
        low.claim_type = Some("INSTITUTIONAL".into());

        let resolved = resolver.resolve(vec![high, low]);
        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();
        assert_eq!(claim.claim_type.as_deref(), Some("PROFESSIONAL"));
    }

    #[test]
    fn test_full_tie_keeps_last_delivered() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut first = record("C1");
        first.claim_type = Some("A".into());
        let mut second = record("C1");
        second.claim_type = Some("B".into());

        let resolved = resolver.resolve(vec![first, second]);
        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();
        assert_eq!(claim.claim_type.as_deref(), Some("B"));
    }

    #[test]
    fn test_batch_merges_onto_carried_records() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut stored = record("C1");
        stored.updated_at = Some("2021-02-01T00:00:00Z".into());
        stored.claim_status = Some("BILLED".into());
        let mut kept = record("C2");
        kept.claim_status = Some("OPEN".into());

        let mut update = record("C1");
        update.updated_at = Some("2021-03-01T00:00:00Z".into());
        update.claim_status = Some("CLOSED".into());

        let resolved =
            resolver.resolve_onto(vec![stored, kept.clone()], vec![update.clone(), record("C3")]);

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved.report.input_records, 2);
        assert_eq!(resolved.report.carried_records, 2);
        assert_eq!(resolved.report.updated_claims, 1);
        assert_eq!(resolved.report.superseded_records, 0);
        let c1 = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();
        assert_eq!(c1.claim_status, ClaimStatus::Closed);
        assert_eq!(resolved.records, vec![update, kept, record("C3")]);
    }

    #[test]
    fn test_stale_batch_record_loses_to_carried() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut stored = record("C1");
        stored.updated_at = Some("2021-03-01T00:00:00Z".into());
        stored.claim_status = Some("CLOSED".into());
        let mut stale = record("C1");
        stale.updated_at = Some("2021-01-01T00:00:00Z".into());
        stale.claim_status = Some("OPEN".into());

        let resolved = resolver.resolve_onto(vec![stored], vec![stale]);

        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();
        assert_eq!(claim.claim_status, ClaimStatus::Closed);
        assert_eq!(resolved.report.updated_claims, 0);
        assert_eq!(resolved.report.superseded_records, 1);
    }

    #[test]
    fn test_unresolvable_payer_kept_as_unassigned() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut rec = record("C1");
        rec.primary_payer_id = Some("P404".into());
        rec.secondary_payer_id = Some("P2".into());

        let resolved = resolver.resolve(vec![rec]);
        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();

        assert!(claim.has_unassigned_payer());
        assert_eq!(claim.secondary_payer_id, Some(PayerId::new("P2").unwrap()));
        assert_eq!(resolved.report.unresolved_primary_payers, 1);
        assert_eq!(resolved.report.unresolved_secondary_payers, 0);
    }

    #[test]
    fn test_fields_are_normalized() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut rec = record("C1");
        rec.service_date = Some("2021-01-01T08:15:00Z".into());
        rec.outstanding_balance = Some("125.50".into());
        rec.claim_status = Some("mystery".into());
        rec.diagnosis_codes = vec![" ".into(), "I10".into()];
        rec.patient_id = Some("".into());

        let resolved = resolver.resolve(vec![rec]);
        let claim = resolved.get(&ClaimId::new("C1").unwrap()).unwrap();

        assert_eq!(
            claim.service_date,
            chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
        );
        assert_eq!(
            claim.outstanding_balance.map(|m| m.amount()),
            Some(rust_decimal_macros::dec!(125.50))
        );
        assert_eq!(claim.claim_status, ClaimStatus::Unknown);
        assert_eq!(claim.primary_diagnosis(), Some("I10"));
        assert_eq!(claim.patient_id, None);
        assert_eq!(resolved.report.unknown_statuses, 1);
    }

    #[test]
    fn test_bad_service_date_is_counted_and_claim_kept() {
        let dim = dimension();
        let resolver = ClaimsContextResolver::new(&dim, Currency::USD);

        let mut rec = record("C1");
        rec.service_date = Some("01/01/2021".into());

        let resolved = resolver.resolve(vec![rec]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.report.unparseable_service_dates, 1);
    }
}
