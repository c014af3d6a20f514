//! Property-Based Test Generators
//!
//! Proptest strategies for raw source rows and normalized facts. Generated
//! rows are well formed unless the strategy name says otherwise.

use chrono::{Duration, NaiveDate};
use core_kernel::{ClaimId, Currency, Money, TransactionId};
use domain_billing::{RawTransactionRecord, Transaction, TransactionType};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for every transaction type
pub fn transaction_type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Charge),
        Just(TransactionType::Payment),
        Just(TransactionType::Adjustment),
        Just(TransactionType::TransferIn),
        Just(TransactionType::TransferOut),
    ]
}

/// Strategy for non-negative amounts with up to four decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64, 0u32..=4u32).prop_map(|(m, s)| Decimal::new(m, s))
}

/// Strategy for dates in 2021
pub fn date_2021_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..365i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid date") + Duration::days(days)
    })
}

/// Strategy for claim ids drawn from a small pool so facts collide on claims
pub fn claim_id_strategy(pool: u32) -> impl Strategy<Value = ClaimId> {
    (0..pool.max(1)).prop_map(|n| ClaimId::new(format!("C{n}")).expect("non-blank claim id"))
}

/// Strategy for a normalized USD fact
///
/// Transaction ids are not unique across draws; use
/// [`transactions_strategy`] for a batch with distinct ids.
pub fn transaction_strategy(claim_pool: u32) -> impl Strategy<Value = Transaction> {
    (
        claim_id_strategy(claim_pool),
        transaction_type_strategy(),
        amount_strategy(),
        date_2021_strategy(),
    )
        .prop_map(|(claim_id, kind, amount, date)| {
            Transaction::new(
                TransactionId::new("T").expect("non-blank transaction id"),
                claim_id,
                kind,
                Money::new(amount, Currency::USD),
                date,
            )
        })
}

/// Strategy for a batch of facts with distinct transaction ids
pub fn transactions_strategy(
    claim_pool: u32,
    max_len: usize,
) -> impl Strategy<Value = Vec<Transaction>> {
    proptest::collection::vec(transaction_strategy(claim_pool), 0..max_len).prop_map(|mut txs| {
        for (i, tx) in txs.iter_mut().enumerate() {
            tx.transaction_id = TransactionId::new(format!("T{i}")).expect("non-blank transaction id");
        }
        txs
    })
}

/// Strategy for a well-formed raw transaction row
pub fn raw_transaction_strategy(claim_pool: u32) -> impl Strategy<Value = RawTransactionRecord> {
    transaction_strategy(claim_pool).prop_map(|tx| RawTransactionRecord {
        transaction_id: Some(tx.transaction_id.to_string()),
        claim_id: Some(tx.claim_id.to_string()),
        transaction_type: Some(tx.transaction_type.code().to_string()),
        amount: Some(tx.amount.amount().to_string()),
        currency: None,
        effective_date: Some(tx.effective_date.to_string()),
        posted_date: None,
    })
}
