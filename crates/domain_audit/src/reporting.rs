//! Consumer reporting over the audit relation
//!
//! Pure read-side computations used by dashboards and the read API: row
//! filtering, headline KPIs, a per-payer contract scorecard, the exception
//! breakdown and monthly payment trends. Payer names are joined from the
//! [`PayerDimension`] at read time; rows whose primary payer does not
//! resolve are labelled [`UNKNOWN_PAYER_NAME`].

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Currency, DateRange, Money, PayerId};
use domain_claims::{PayerDimension, UNKNOWN_PAYER_NAME};

use crate::audit::ClaimAudit;
use crate::error::AuditError;
use crate::exception::ExceptionFlag;

/// Display name of the payer a row is attributed to
pub fn payer_name<'p>(row: &ClaimAudit, payers: &'p PayerDimension) -> &'p str {
    match row.primary_payer_id.as_ref() {
        Some(id) => payers.name_for(Some(id)),
        None => UNKNOWN_PAYER_NAME,
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Which date the query window applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    #[default]
    FirstTransaction,
    Service,
}

/// Filter over audit rows
///
/// Empty payer and flag lists admit every row. A bounded date window
/// excludes rows that lack the chosen date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    pub date_basis: DateBasis,
    pub range: DateRange,
    pub payer_names: Vec<String>,
    pub exception_flags: Vec<ExceptionFlag>,
}

impl AuditQuery {
    /// A query that admits every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts rows to an inclusive date window
    pub fn between(
        mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, AuditError> {
        self.range = DateRange::new(start, end)?;
        Ok(self)
    }

    pub fn on(mut self, basis: DateBasis) -> Self {
        self.date_basis = basis;
        self
    }

    pub fn with_payer_name(mut self, name: impl Into<String>) -> Self {
        self.payer_names.push(name.into());
        self
    }

    pub fn with_exception_flag(mut self, flag: ExceptionFlag) -> Self {
        self.exception_flags.push(flag);
        self
    }

    /// Returns true if the row passes every filter
    pub fn matches(&self, row: &ClaimAudit, payers: &PayerDimension) -> bool {
        let date = match self.date_basis {
            DateBasis::FirstTransaction => row.first_transaction_date,
            DateBasis::Service => row.service_date,
        };
        if !self.range.contains_optional(date) {
            return false;
        }
        if !self.exception_flags.is_empty() && !self.exception_flags.contains(&row.exception_flag) {
            return false;
        }
        if !self.payer_names.is_empty() {
            let name = payer_name(row, payers);
            if !self.payer_names.iter().any(|wanted| wanted == name) {
                return false;
            }
        }
        true
    }

    /// Selects the matching rows, preserving input order
    pub fn apply<'a, I>(&self, rows: I, payers: &PayerDimension) -> Vec<&'a ClaimAudit>
    where
        I: IntoIterator<Item = &'a ClaimAudit>,
    {
        rows.into_iter().filter(|row| self.matches(row, payers)).collect()
    }
}

// ============================================================================
// KPI overview
// ============================================================================

/// Headline figures over a set of audit rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiOverview {
    pub claim_count: usize,
    pub total_charges: Money,
    pub total_payments: Money,
    pub net_variance: Money,
    pub underpaid_claims: usize,
    /// Percentage of claims flagged UNDERPAID, two decimal places
    pub underpayment_rate: Decimal,
}

/// Computes the KPI overview
pub fn kpi_overview<'a, I>(rows: I, currency: Currency) -> Result<KpiOverview, AuditError>
where
    I: IntoIterator<Item = &'a ClaimAudit>,
{
    let mut overview = KpiOverview {
        claim_count: 0,
        total_charges: Money::zero(currency),
        total_payments: Money::zero(currency),
        net_variance: Money::zero(currency),
        underpaid_claims: 0,
        underpayment_rate: Decimal::ZERO,
    };

    for row in rows {
        overview.claim_count += 1;
        overview.total_charges = overview.total_charges.checked_add(&row.total_charges)?;
        overview.total_payments = overview.total_payments.checked_add(&row.total_payments)?;
        overview.net_variance = overview.net_variance.checked_add(&row.net_variance)?;
        if row.exception_flag == ExceptionFlag::Underpaid {
            overview.underpaid_claims += 1;
        }
    }

    if overview.claim_count > 0 {
        overview.underpayment_rate = (Decimal::from(overview.underpaid_claims) * dec!(100)
            / Decimal::from(overview.claim_count))
        .round_dp(2);
    }
    Ok(overview)
}

// ============================================================================
// Payer scorecard
// ============================================================================

/// Contract health of a payer, from its variance percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Strong,
    Stable,
    Weak,
}

impl RiskLevel {
    /// Rates a payer from its totals
    ///
    /// Without charges the percentage is undefined; any positive variance
    /// then rates `Strong` and anything else `Weak`.
    pub fn rate(net_variance: &Money, total_charges: &Money) -> Self {
        if total_charges.is_zero() {
            return if net_variance.amount() > Decimal::ZERO {
                RiskLevel::Strong
            } else {
                RiskLevel::Weak
            };
        }
        Self::from_variance_pct(variance_pct(net_variance, total_charges))
    }

    /// `Strong` at 1% and above, `Stable` at 0.2% and above, otherwise
    /// `Weak`. An undefined percentage is `Weak`.
    pub fn from_variance_pct(pct: Option<Decimal>) -> Self {
        match pct {
            Some(p) if p >= dec!(1.0) => RiskLevel::Strong,
            Some(p) if p >= dec!(0.2) => RiskLevel::Stable,
            _ => RiskLevel::Weak,
        }
    }

    pub fn contract_action(&self) -> &'static str {
        match self {
            RiskLevel::Strong => "Favorable contract - No action needed",
            RiskLevel::Stable => "Monitor - Review during next renewal",
            RiskLevel::Weak => "Low margin - Prioritize renegotiation",
        }
    }
}

/// One scorecard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerScore {
    pub payer_id: Option<PayerId>,
    pub payer_name: String,
    pub claim_count: usize,
    pub total_charges: Money,
    pub total_payments: Money,
    pub net_variance: Money,
    /// Net variance as a percentage of charges, three decimal places
    pub variance_pct: Option<Decimal>,
    pub risk_level: RiskLevel,
    pub contract_action: String,
}

/// Net variance over charges in percent, `None` when nothing was charged
pub fn variance_pct(net_variance: &Money, total_charges: &Money) -> Option<Decimal> {
    net_variance
        .amount()
        .checked_mul(dec!(100))?
        .checked_div(total_charges.amount())
        .map(|pct| pct.round_dp(3))
}

/// Order of scorecard lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorecardOrder {
    /// Most favorable net variance first
    #[default]
    NetVariance,
    /// Largest net variance in either direction first
    AbsNetVariance,
}

impl ScorecardOrder {
    /// Sorts lines in place; ties keep their current order
    pub fn sort(self, scores: &mut [PayerScore]) {
        match self {
            ScorecardOrder::NetVariance => {
                scores.sort_by(|a, b| b.net_variance.amount().cmp(&a.net_variance.amount()))
            }
            ScorecardOrder::AbsNetVariance => scores.sort_by(|a, b| {
                b.net_variance
                    .amount()
                    .abs()
                    .cmp(&a.net_variance.amount().abs())
            }),
        }
    }
}

/// Payers shown by the top-payers view unless asked otherwise
pub const TOP_PAYERS: usize = 10;

/// The `limit` payers with the largest absolute net variance
pub fn top_payers_by_variance<'a, I>(
    rows: I,
    payers: &PayerDimension,
    currency: Currency,
    limit: usize,
) -> Result<Vec<PayerScore>, AuditError>
where
    I: IntoIterator<Item = &'a ClaimAudit>,
{
    let mut scores = payer_scorecard(rows, payers, currency)?;
    ScorecardOrder::AbsNetVariance.sort(&mut scores);
    scores.truncate(limit);
    Ok(scores)
}

/// Builds the payer scorecard, sorted by net variance descending
pub fn payer_scorecard<'a, I>(
    rows: I,
    payers: &PayerDimension,
    currency: Currency,
) -> Result<Vec<PayerScore>, AuditError>
where
    I: IntoIterator<Item = &'a ClaimAudit>,
{
    let mut groups: BTreeMap<(String, Option<PayerId>), (usize, Money, Money, Money)> =
        BTreeMap::new();
    for row in rows {
        let key = (payer_name(row, payers).to_string(), row.primary_payer_id.clone());
        let (count, charges, payments, variance) = groups.entry(key).or_insert((
            0,
            Money::zero(currency),
            Money::zero(currency),
            Money::zero(currency),
        ));
        *count += 1;
        *charges = charges.checked_add(&row.total_charges)?;
        *payments = payments.checked_add(&row.total_payments)?;
        *variance = variance.checked_add(&row.net_variance)?;
    }

    let mut scores: Vec<PayerScore> = groups
        .into_iter()
        .map(|((payer_name, payer_id), (claim_count, total_charges, total_payments, net_variance))| {
            let variance_pct = variance_pct(&net_variance, &total_charges);
            let risk_level = RiskLevel::rate(&net_variance, &total_charges);
            PayerScore {
                payer_id,
                payer_name,
                claim_count,
                total_charges,
                total_payments,
                net_variance,
                variance_pct,
                risk_level,
                contract_action: risk_level.contract_action().to_string(),
            }
        })
        .collect();

    // Stable sort keeps name order among equal variances.
    ScorecardOrder::NetVariance.sort(&mut scores);
    Ok(scores)
}

// ============================================================================
// Exception breakdown and trends
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCount {
    pub exception_flag: ExceptionFlag,
    pub claim_count: usize,
}

/// Claims per exception flag, every flag listed in rule order
pub fn exception_breakdown<'a, I>(rows: I) -> Vec<ExceptionCount>
where
    I: IntoIterator<Item = &'a ClaimAudit>,
{
    let mut counts: BTreeMap<ExceptionFlag, usize> =
        ExceptionFlag::ALL.into_iter().map(|flag| (flag, 0)).collect();
    for row in rows {
        *counts.entry(row.exception_flag).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(exception_flag, claim_count)| ExceptionCount {
            exception_flag,
            claim_count,
        })
        .collect()
}

/// Payments received for one payer in one service month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPayments {
    /// `YYYY-MM`
    pub month: String,
    pub payer_name: String,
    pub total_payments: Money,
}

/// Payments per service month and payer; rows without a service date are skipped
pub fn monthly_payments<'a, I>(
    rows: I,
    payers: &PayerDimension,
    currency: Currency,
) -> Result<Vec<MonthlyPayments>, AuditError>
where
    I: IntoIterator<Item = &'a ClaimAudit>,
{
    let mut buckets: BTreeMap<((i32, u32), String), Money> = BTreeMap::new();
    for row in rows {
        let Some(service_date) = row.service_date else {
            continue;
        };
        let key = (
            (service_date.year(), service_date.month()),
            payer_name(row, payers).to_string(),
        );
        let total = buckets.entry(key).or_insert(Money::zero(currency));
        *total = total.checked_add(&row.total_payments)?;
    }

    Ok(buckets
        .into_iter()
        .map(|(((year, month), payer_name), total_payments)| MonthlyPayments {
            month: format!("{year:04}-{month:02}"),
            payer_name,
            total_payments,
        })
        .collect())
}
