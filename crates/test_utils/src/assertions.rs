//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!` on the whole struct.

use core_kernel::Money;
use domain_audit::{ClaimAudit, ExceptionFlag};
use domain_billing::ClaimFinancialSummary;
use rust_decimal::Decimal;

/// Asserts that a Money value has the expected amount, ignoring scale
///
/// # Panics
///
/// Panics if the amounts differ. `100` and `100.00` compare equal.
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money amount mismatch: actual={} {}, expected={}",
        actual.currency(),
        actual.amount(),
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that the transfer total is the sum of both directions
pub fn assert_transfers_reconcile(summary: &ClaimFinancialSummary) {
    let both = summary.total_transfers_in.amount() + summary.total_transfers_out.amount();
    assert_eq!(
        summary.total_transfers.amount(),
        both,
        "Transfers for claim {} do not reconcile: total={}, in+out={}",
        summary.claim_id,
        summary.total_transfers.amount(),
        both
    );
}

/// Asserts the derived columns of an audit row
///
/// Checks that net variance is payments minus charges and that the
/// exception flag matches the expected one.
pub fn assert_audit_row(row: &ClaimAudit, expected_flag: ExceptionFlag) {
    let variance = row.total_payments.amount() - row.total_charges.amount();
    assert_eq!(
        row.net_variance.amount(),
        variance,
        "Net variance for claim {} is {}, expected payments - charges = {}",
        row.claim_id,
        row.net_variance.amount(),
        variance
    );
    assert_eq!(
        row.exception_flag, expected_flag,
        "Claim {} flagged {}, expected {}",
        row.claim_id, row.exception_flag, expected_flag
    );
}

/// Asserts that rows are strictly ordered by claim id
pub fn assert_sorted_by_claim(rows: &[ClaimAudit]) {
    for pair in rows.windows(2) {
        assert!(
            pair[0].claim_id < pair[1].claim_id,
            "Audit rows out of order: {} before {}",
            pair[0].claim_id,
            pair[1].claim_id
        );
    }
}
