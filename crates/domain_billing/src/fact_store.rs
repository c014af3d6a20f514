//! Transaction Fact Store
//!
//! Append-only store of financial transactions keyed by transaction id.
//! Transactions whose claim is not in the current resolver output are held
//! as orphans and promoted on a later ingest once the claim appears.
//!
//! Stored transactions are never modified or removed. A re-delivered
//! identical row is a no-op; a re-delivered id with different contents is a
//! conflict and the stored version is kept.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use core_kernel::{ClaimId, Currency, TransactionId};

use crate::transaction::{RawTransactionRecord, Transaction};

/// Counters describing one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Rows offered to the store
    pub received: usize,
    /// Rows excluded because they failed validation
    pub malformed: usize,
    /// New facts appended for known claims
    pub appended: usize,
    /// Identical re-deliveries ignored
    pub duplicates: usize,
    /// Re-deliveries that differ from the stored row
    pub conflicts: usize,
    /// New rows held because their claim is unknown
    pub orphaned: usize,
    /// Previously held rows whose claim has now appeared
    pub orphans_promoted: usize,
    /// Orphans still held after this pass
    pub orphans_held: usize,
}

/// Outcome of offering one transaction to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Appended,
    Orphaned,
    Duplicate,
    Conflict,
}

/// Append-only store of transaction facts plus the orphan hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFactStore {
    facts: BTreeMap<TransactionId, Transaction>,
    orphans: BTreeMap<TransactionId, Transaction>,
}

impl TransactionFactStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted facts and orphans
    ///
    /// The persisted state was produced by this store, so ids are expected
    /// to be unique; if they are not, the first occurrence is kept.
    pub fn from_parts(
        facts: impl IntoIterator<Item = Transaction>,
        orphans: impl IntoIterator<Item = Transaction>,
    ) -> Self {
        let mut store = Self::new();
        for tx in facts {
            store.facts.entry(tx.transaction_id.clone()).or_insert(tx);
        }
        for tx in orphans {
            if !store.facts.contains_key(&tx.transaction_id) {
                store.orphans.entry(tx.transaction_id.clone()).or_insert(tx);
            }
        }
        store
    }

    /// Normalizes raw rows, then ingests the valid ones
    ///
    /// Malformed rows are excluded and counted; they never fail the pass.
    #[instrument(skip_all, fields(records = records.len(), currency = %currency))]
    pub fn ingest_raw<F>(
        &mut self,
        records: Vec<RawTransactionRecord>,
        currency: Currency,
        is_known: F,
    ) -> IngestionReport
    where
        F: Fn(&ClaimId) -> bool,
    {
        let received = records.len();
        let mut malformed = 0;
        let mut valid = Vec::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            match record.normalize(currency) {
                Ok(tx) => valid.push(tx),
                Err(err) => {
                    debug!(position, transaction_id = ?record.transaction_id, error = %err, "Excluding malformed transaction");
                    malformed += 1;
                }
            }
        }
        if malformed > 0 {
            warn!(malformed, "Transactions excluded as malformed");
        }

        let mut report = self.ingest(valid, is_known);
        report.received = received;
        report.malformed = malformed;
        report
    }

    /// Ingests normalized transactions
    ///
    /// Held orphans are reconsidered first, so a claim that appears in this
    /// pass picks up both its earlier and its new transactions.
    ///
    /// # Arguments
    ///
    /// * `transactions` - Transactions in delivery order
    /// * `is_known` - Whether a claim id is part of the current resolver output
    #[instrument(skip_all, fields(transactions = transactions.len()))]
    pub fn ingest<F>(&mut self, transactions: Vec<Transaction>, is_known: F) -> IngestionReport
    where
        F: Fn(&ClaimId) -> bool,
    {
        let mut report = IngestionReport {
            received: transactions.len(),
            ..IngestionReport::default()
        };

        report.orphans_promoted = self.promote_orphans(&is_known);

        for tx in transactions {
            match self.place(tx, &is_known) {
                Placement::Appended => report.appended += 1,
                Placement::Orphaned => report.orphaned += 1,
                Placement::Duplicate => report.duplicates += 1,
                Placement::Conflict => report.conflicts += 1,
            }
        }

        report.orphans_held = self.orphans.len();
        if report.conflicts > 0 {
            warn!(conflicts = report.conflicts, "Re-delivered transactions differ from stored facts");
        }
        if report.orphans_held > 0 {
            warn!(orphans = report.orphans_held, "Transactions held for unknown claims");
        }
        info!(
            appended = report.appended,
            duplicates = report.duplicates,
            orphans_promoted = report.orphans_promoted,
            facts = self.facts.len(),
            "Transactions ingested"
        );
        report
    }

    fn promote_orphans<F>(&mut self, is_known: &F) -> usize
    where
        F: Fn(&ClaimId) -> bool,
    {
        let ready: Vec<TransactionId> = self
            .orphans
            .values()
            .filter(|tx| is_known(&tx.claim_id))
            .map(|tx| tx.transaction_id.clone())
            .collect();

        for id in &ready {
            if let Some(tx) = self.orphans.remove(id) {
                debug!(transaction_id = %id, claim_id = %tx.claim_id, "Promoting orphan transaction");
                self.facts.insert(id.clone(), tx);
            }
        }
        ready.len()
    }

    fn place<F>(&mut self, tx: Transaction, is_known: &F) -> Placement
    where
        F: Fn(&ClaimId) -> bool,
    {
        let stored = self
            .facts
            .get(&tx.transaction_id)
            .or_else(|| self.orphans.get(&tx.transaction_id));
        if let Some(stored) = stored {
            if *stored == tx {
                return Placement::Duplicate;
            }
            warn!(
                transaction_id = %tx.transaction_id,
                "Conflicting re-delivery, keeping stored transaction"
            );
            return Placement::Conflict;
        }

        if is_known(&tx.claim_id) {
            self.facts.insert(tx.transaction_id.clone(), tx);
            Placement::Appended
        } else {
            debug!(transaction_id = %tx.transaction_id, claim_id = %tx.claim_id, "Holding orphan transaction");
            self.orphans.insert(tx.transaction_id.clone(), tx);
            Placement::Orphaned
        }
    }

    /// Stored facts, ordered by transaction id
    pub fn facts(&self) -> impl Iterator<Item = &Transaction> {
        self.facts.values()
    }

    /// Held orphans, ordered by transaction id
    pub fn orphans(&self) -> impl Iterator<Item = &Transaction> {
        self.orphans.values()
    }

    pub fn get(&self, transaction_id: &TransactionId) -> Option<&Transaction> {
        self.facts.get(transaction_id)
    }

    pub fn is_orphan(&self, transaction_id: &TransactionId) -> bool {
        self.orphans.contains_key(transaction_id)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use chrono::NaiveDate;
    use core_kernel::Money;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn tx(id: &str, claim: &str, amount: rust_decimal::Decimal) -> Transaction {
        Transaction::new(
            TransactionId::new(id).unwrap(),
            ClaimId::new(claim).unwrap(),
            TransactionType::Charge,
            Money::new(amount, Currency::USD),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        )
    }

    fn known(ids: &[&str]) -> impl Fn(&ClaimId) -> bool {
        let ids: BTreeSet<String> = ids.iter().map(|s| s.to_string()).collect();
        move |claim: &ClaimId| ids.contains(claim.as_str())
    }

    #[test]
    fn test_appends_known_claims() {
        let mut store = TransactionFactStore::new();
        let report = store.ingest(vec![tx("T1", "C1", dec!(10)), tx("T2", "C1", dec!(5))], known(&["C1"]));
        assert_eq!(report.appended, 2);
        assert_eq!(store.fact_count(), 2);
    }

    #[test]
    fn test_identical_redelivery_is_noop() {
        let mut store = TransactionFactStore::new();
        store.ingest(vec![tx("T1", "C1", dec!(10))], known(&["C1"]));
        let report = store.ingest(vec![tx("T1", "C1", dec!(10))], known(&["C1"]));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.appended, 0);
        assert_eq!(store.fact_count(), 1);
    }

    #[test]
    fn test_conflicting_redelivery_keeps_stored() {
        let mut store = TransactionFactStore::new();
        store.ingest(vec![tx("T1", "C1", dec!(10))], known(&["C1"]));
        let report = store.ingest(vec![tx("T1", "C1", dec!(99))], known(&["C1"]));

        assert_eq!(report.conflicts, 1);
        let stored = store.get(&TransactionId::new("T1").unwrap()).unwrap();
        assert_eq!(stored.amount.amount(), dec!(10));
    }

    #[test]
    fn test_orphan_held_then_promoted() {
        let mut store = TransactionFactStore::new();
        let first = store.ingest(vec![tx("T1", "C9", dec!(10))], known(&["C1"]));
        assert_eq!(first.orphaned, 1);
        assert_eq!(first.orphans_held, 1);
        assert_eq!(store.fact_count(), 0);

        let second = store.ingest(vec![], known(&["C1", "C9"]));
        assert_eq!(second.orphans_promoted, 1);
        assert_eq!(second.orphans_held, 0);
        assert_eq!(store.fact_count(), 1);
    }

    #[test]
    fn test_redelivered_orphan_is_duplicate() {
        let mut store = TransactionFactStore::new();
        store.ingest(vec![tx("T1", "C9", dec!(10))], known(&[]));
        let report = store.ingest(vec![tx("T1", "C9", dec!(10))], known(&[]));
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.orphan_count(), 1);
    }

    #[test]
    fn test_ingest_raw_counts_malformed() {
        let mut store = TransactionFactStore::new();
        let good = RawTransactionRecord {
            transaction_id: Some("T1".into()),
            claim_id: Some("C1".into()),
            transaction_type: Some("PAYMENT".into()),
            amount: Some("20".into()),
            effective_date: Some("2021-01-02".into()),
            ..RawTransactionRecord::default()
        };
        let bad = RawTransactionRecord {
            amount: Some("-20".into()),
            transaction_id: Some("T2".into()),
            ..good.clone()
        };

        let report = store.ingest_raw(vec![good, bad, RawTransactionRecord::default()], Currency::USD, known(&["C1"]));

        assert_eq!(report.received, 3);
        assert_eq!(report.malformed, 2);
        assert_eq!(report.appended, 1);
    }

    #[test]
    fn test_from_parts_round_trips_state() {
        let mut store = TransactionFactStore::new();
        store.ingest(vec![tx("T1", "C1", dec!(1)), tx("T2", "C2", dec!(2))], known(&["C1"]));

        let rebuilt = TransactionFactStore::from_parts(
            store.facts().cloned().collect::<Vec<_>>(),
            store.orphans().cloned().collect::<Vec<_>>(),
        );
        assert_eq!(rebuilt, store);
        assert!(rebuilt.is_orphan(&TransactionId::new("T2").unwrap()));
    }
}
