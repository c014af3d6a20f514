//! Financial transactions tied to a claim
//!
//! Source feeds deliver one row per financial event. This module defines
//! the raw shape, the normalized [`Transaction`], and the rules that decide
//! whether a raw row is usable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::temporal::parse_source_date;
use core_kernel::{ClaimId, Currency, Money, TransactionId};

use crate::error::BillingError;

/// Kind of financial event
///
/// Transfers are recorded with a direction because the audit relation
/// reports money moved in and out separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Charge,
    Payment,
    Adjustment,
    TransferIn,
    TransferOut,
}

/// The four categories totals are grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Charge,
    Payment,
    Adjustment,
    Transfer,
}

impl TransactionType {
    /// Parses a source type code
    ///
    /// A bare `TRANSFER` carries its direction in the sign of the amount,
    /// so it is resolved by the caller once the amount is known.
    fn parse(raw: &str, amount: &Money) -> Result<Self, BillingError> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != ' ' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match key.as_str() {
            "CHARGE" => Ok(TransactionType::Charge),
            "PAYMENT" => Ok(TransactionType::Payment),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            "TRANSFERIN" => Ok(TransactionType::TransferIn),
            "TRANSFEROUT" => Ok(TransactionType::TransferOut),
            "TRANSFER" if amount.is_negative() => Ok(TransactionType::TransferOut),
            "TRANSFER" => Ok(TransactionType::TransferIn),
            _ => Err(BillingError::UnknownTransactionType(raw.to_string())),
        }
    }

    /// Returns the grouping category
    pub fn category(&self) -> TransactionCategory {
        match self {
            TransactionType::Charge => TransactionCategory::Charge,
            TransactionType::Payment => TransactionCategory::Payment,
            TransactionType::Adjustment => TransactionCategory::Adjustment,
            TransactionType::TransferIn | TransactionType::TransferOut => {
                TransactionCategory::Transfer
            }
        }
    }

    /// Returns the canonical code
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Charge => "CHARGE",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
        }
    }

    /// Returns true for either transfer direction
    pub fn is_transfer(&self) -> bool {
        matches!(self, TransactionType::TransferIn | TransactionType::TransferOut)
    }

    /// Charges and payments are recorded as positive amounts
    fn requires_non_negative(&self) -> bool {
        matches!(self, TransactionType::Charge | TransactionType::Payment)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parses a canonical code as produced by [`TransactionType::code`]
impl FromStr for TransactionType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TransactionType::Charge,
            TransactionType::Payment,
            TransactionType::Adjustment,
            TransactionType::TransferIn,
            TransactionType::TransferOut,
        ]
        .into_iter()
        .find(|kind| kind.code() == s)
        .ok_or_else(|| BillingError::UnknownTransactionType(s.to_string()))
    }
}

/// A normalized, immutable financial event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub claim_id: ClaimId,
    pub transaction_type: TransactionType,
    /// Signed amount as recorded by the source
    pub amount: Money,
    pub effective_date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
}

impl Transaction {
    /// Creates a transaction
    pub fn new(
        transaction_id: TransactionId,
        claim_id: ClaimId,
        transaction_type: TransactionType,
        amount: Money,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            transaction_id,
            claim_id,
            transaction_type,
            amount,
            effective_date,
            posted_date: None,
        }
    }

    /// Sets the posting date
    pub fn posted_on(mut self, date: NaiveDate) -> Self {
        self.posted_date = Some(date);
        self
    }
}

/// A transaction row as delivered by a source feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTransactionRecord {
    pub transaction_id: Option<String>,
    pub claim_id: Option<String>,
    pub transaction_type: Option<String>,
    pub amount: Option<String>,
    /// ISO 4217 code; absent means the pipeline currency
    pub currency: Option<String>,
    pub effective_date: Option<String>,
    pub posted_date: Option<String>,
}

impl RawTransactionRecord {
    /// Validates and normalizes the row
    ///
    /// # Arguments
    ///
    /// * `currency` - The single currency the pipeline aggregates in
    ///
    /// # Errors
    ///
    /// Returns an error for a missing identifier, claim reference, type,
    /// amount or effective date, for unparseable values, for a currency
    /// other than `currency`, and for a negative charge or payment.
    pub fn normalize(&self, currency: Currency) -> Result<Transaction, BillingError> {
        let transaction_id = TransactionId::from_optional(self.transaction_id.as_deref())
            .ok_or(BillingError::MissingField("transaction_id"))?;
        let claim_id = ClaimId::from_optional(self.claim_id.as_deref())
            .ok_or(BillingError::MissingField("claim_id"))?;
        let raw_type = required(self.transaction_type.as_deref(), "transaction_type")?;
        let raw_amount = required(self.amount.as_deref(), "amount")?;
        let raw_effective = required(self.effective_date.as_deref(), "effective_date")?;

        if let Some(code) = self.currency.as_deref().filter(|c| !c.trim().is_empty()) {
            let found: Currency = code.parse().map_err(|_| BillingError::UnsupportedCurrency {
                found: code.to_string(),
                expected: currency.to_string(),
            })?;
            if found != currency {
                return Err(BillingError::UnsupportedCurrency {
                    found: found.to_string(),
                    expected: currency.to_string(),
                });
            }
        }

        let amount = Money::parse(raw_amount, currency)
            .map_err(|_| BillingError::InvalidAmount(raw_amount.to_string()))?;
        let transaction_type = TransactionType::parse(raw_type, &amount)?;
        if transaction_type.requires_non_negative() && amount.is_negative() {
            return Err(BillingError::NegativeAmount {
                transaction_type: transaction_type.to_string(),
                amount: raw_amount.to_string(),
            });
        }

        let effective_date = parse_source_date(raw_effective).map_err(|_| BillingError::InvalidDate {
            field: "effective_date",
            value: raw_effective.to_string(),
        })?;
        let posted_date = match self.posted_date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => Some(parse_source_date(raw).map_err(|_| BillingError::InvalidDate {
                field: "posted_date",
                value: raw.to_string(),
            })?),
            None => None,
        };

        Ok(Transaction {
            transaction_id,
            claim_id,
            transaction_type,
            amount,
            effective_date,
            posted_date,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, BillingError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BillingError::MissingField(field))
}
