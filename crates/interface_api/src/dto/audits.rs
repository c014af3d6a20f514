//! Audit query DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use domain_audit::{AuditQuery, ClaimAudit, DateBasis, ExceptionFlag};

use crate::error::ApiError;

/// Query string accepted by the audit and report routes
///
/// `payer` and `exception_flag` take comma-separated lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQueryParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub date_basis: Option<DateBasis>,
    pub payer: Option<String>,
    pub exception_flag: Option<String>,
}

impl AuditQueryParams {
    /// Converts the parameters into a domain query
    pub fn into_query(self) -> Result<AuditQuery, ApiError> {
        let mut query = AuditQuery::all()
            .on(self.date_basis.unwrap_or_default())
            .between(self.start, self.end)?;

        for name in split_list(self.payer.as_deref()) {
            query = query.with_payer_name(name);
        }
        for code in split_list(self.exception_flag.as_deref()) {
            query = query.with_exception_flag(code.parse::<ExceptionFlag>()?);
        }
        Ok(query)
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditListResponse {
    pub count: usize,
    pub rows: Vec<ClaimAudit>,
}

impl From<Vec<ClaimAudit>> for AuditListResponse {
    fn from(rows: Vec<ClaimAudit>) -> Self {
        Self {
            count: rows.len(),
            rows,
        }
    }
}
