//! Request and response bodies

pub mod audits;
pub mod reports;

pub use audits::{AuditListResponse, AuditQueryParams};
pub use reports::{ReportResponse, ScorecardParams};
