//! Exception classification
//!
//! Every audited claim gets exactly one [`ExceptionFlag`]. The flag is chosen
//! by walking an ordered rule list and taking the first rule that matches;
//! `MATCHED` is the fallback when no rule does.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::Money;

use crate::error::AuditError;

/// Categorical label describing how a claim settled
///
/// Declaration order is rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionFlag {
    /// Nothing charged and nothing paid
    NoCharge,
    /// Charged but nothing paid
    ZeroPay,
    /// Paid less than charged
    Underpaid,
    /// Paid more than charged
    Overpaid,
    /// Paid exactly what was charged
    Matched,
}

impl ExceptionFlag {
    /// Every flag, in rule order
    pub const ALL: [ExceptionFlag; 5] = [
        ExceptionFlag::NoCharge,
        ExceptionFlag::ZeroPay,
        ExceptionFlag::Underpaid,
        ExceptionFlag::Overpaid,
        ExceptionFlag::Matched,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ExceptionFlag::NoCharge => "NO_CHARGE",
            ExceptionFlag::ZeroPay => "ZERO_PAY",
            ExceptionFlag::Underpaid => "UNDERPAID",
            ExceptionFlag::Overpaid => "OVERPAID",
            ExceptionFlag::Matched => "MATCHED",
        }
    }

    /// Returns true for every flag other than `MATCHED`
    pub fn is_exception(&self) -> bool {
        *self != ExceptionFlag::Matched
    }
}

impl fmt::Display for ExceptionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ExceptionFlag {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        ExceptionFlag::ALL
            .into_iter()
            .find(|flag| flag.code() == wanted)
            .ok_or_else(|| AuditError::UnknownExceptionFlag(s.to_string()))
    }
}

/// A single classification rule over (charges, payments)
struct ExceptionRule {
    flag: ExceptionFlag,
    applies: fn(Decimal, Decimal) -> bool,
}

const RULES: [ExceptionRule; 4] = [
    ExceptionRule {
        flag: ExceptionFlag::NoCharge,
        applies: |charges, payments| charges.is_zero() && payments.is_zero(),
    },
    ExceptionRule {
        flag: ExceptionFlag::ZeroPay,
        applies: |charges, payments| charges > Decimal::ZERO && payments.is_zero(),
    },
    ExceptionRule {
        flag: ExceptionFlag::Underpaid,
        applies: |charges, payments| payments > Decimal::ZERO && payments < charges,
    },
    ExceptionRule {
        flag: ExceptionFlag::Overpaid,
        applies: |charges, payments| payments > charges,
    },
];

/// Classifies a claim from its charge and payment totals
///
/// Charges and payments are non-negative after ingestion, so the rules
/// plus the `MATCHED` fallback cover every input.
pub fn classify(total_charges: &Money, total_payments: &Money) -> ExceptionFlag {
    let charges = total_charges.amount();
    let payments = total_payments.amount();
    RULES
        .iter()
        .find(|rule| (rule.applies)(charges, payments))
        .map_or(ExceptionFlag::Matched, |rule| rule.flag)
}
