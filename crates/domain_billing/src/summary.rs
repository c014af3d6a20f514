//! Claim Financial Aggregator
//!
//! Folds every stored transaction of a claim into one
//! [`ClaimFinancialSummary`]. The fold only reads the facts it is given and
//! iterates ordered maps, so the output is identical for identical input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use core_kernel::{ClaimId, Currency, Money};

use crate::error::BillingError;
use crate::transaction::{Transaction, TransactionType};

/// Financial totals of one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFinancialSummary {
    pub claim_id: ClaimId,
    pub total_charges: Money,
    pub total_payments: Money,
    pub total_adjustments: Money,
    /// Inbound plus outbound transfers
    pub total_transfers: Money,
    pub total_transfers_in: Money,
    pub total_transfers_out: Money,
    pub transaction_count: usize,
    pub first_transaction_date: Option<NaiveDate>,
    pub last_transaction_date: Option<NaiveDate>,
}

impl ClaimFinancialSummary {
    /// Summary of a claim with no transactions
    pub fn zero(claim_id: ClaimId, currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            claim_id,
            total_charges: zero,
            total_payments: zero,
            total_adjustments: zero,
            total_transfers: zero,
            total_transfers_in: zero,
            total_transfers_out: zero,
            transaction_count: 0,
            first_transaction_date: None,
            last_transaction_date: None,
        }
    }

    pub fn has_transactions(&self) -> bool {
        self.transaction_count > 0
    }

    fn apply(&mut self, tx: &Transaction) -> Result<(), BillingError> {
        let bucket = match tx.transaction_type {
            TransactionType::Charge => &mut self.total_charges,
            TransactionType::Payment => &mut self.total_payments,
            TransactionType::Adjustment => &mut self.total_adjustments,
            TransactionType::TransferIn => &mut self.total_transfers_in,
            TransactionType::TransferOut => &mut self.total_transfers_out,
        };
        *bucket = bucket.checked_add(&tx.amount)?;
        if tx.transaction_type.is_transfer() {
            self.total_transfers = self.total_transfers.checked_add(&tx.amount)?;
        }

        self.transaction_count += 1;
        self.first_transaction_date = Some(
            self.first_transaction_date
                .map_or(tx.effective_date, |d| d.min(tx.effective_date)),
        );
        self.last_transaction_date = Some(
            self.last_transaction_date
                .map_or(tx.effective_date, |d| d.max(tx.effective_date)),
        );
        Ok(())
    }
}

/// Builds per-claim summaries from transaction facts
#[derive(Debug, Clone, Copy)]
pub struct ClaimFinancialAggregator {
    currency: Currency,
}

impl ClaimFinancialAggregator {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    /// Aggregates facts into one summary per claim
    ///
    /// A summary is produced for every claim id in `claim_ids` and for every
    /// claim referenced by a fact. Claims without transactions get a zero
    /// summary with no dates.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Calculation`] if a fact is in another currency
    /// or a total overflows.
    #[instrument(skip_all, fields(currency = %self.currency))]
    pub fn aggregate<'a, F, C>(
        &self,
        facts: F,
        claim_ids: C,
    ) -> Result<BTreeMap<ClaimId, ClaimFinancialSummary>, BillingError>
    where
        F: IntoIterator<Item = &'a Transaction>,
        C: IntoIterator<Item = &'a ClaimId>,
    {
        let mut summaries: BTreeMap<ClaimId, ClaimFinancialSummary> = claim_ids
            .into_iter()
            .map(|id| (id.clone(), ClaimFinancialSummary::zero(id.clone(), self.currency)))
            .collect();

        let mut fact_count = 0usize;
        for tx in facts {
            summaries
                .entry(tx.claim_id.clone())
                .or_insert_with(|| ClaimFinancialSummary::zero(tx.claim_id.clone(), self.currency))
                .apply(tx)?;
            fact_count += 1;
        }

        info!(
            summaries = summaries.len(),
            facts = fact_count,
            "Claim financials aggregated"
        );
        Ok(summaries)
    }
}
