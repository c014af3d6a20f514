//! Audit Domain
//!
//! Final stage of the pipeline. Each resolved claim is joined with its
//! financial summary into one [`ClaimAudit`] row carrying settlement
//! duration, net variance and an [`ExceptionFlag`]. The [`reporting`] module
//! holds the read-side computations consumers run over those rows.
//!
//! # Exception rules
//!
//! | Order | Flag        | Condition                               |
//! |-------|-------------|-----------------------------------------|
//! | 1     | `NO_CHARGE` | charges = 0 and payments = 0            |
//! | 2     | `ZERO_PAY`  | charges > 0 and payments = 0            |
//! | 3     | `UNDERPAID` | payments > 0 and payments < charges     |
//! | 4     | `OVERPAID`  | payments > charges                      |
//! | -     | `MATCHED`   | fallback (payments = charges > 0)       |

pub mod exception;
pub mod audit;
pub mod reporting;
pub mod error;

pub use exception::{classify, ExceptionFlag};
pub use audit::{build_audits, AuditBuild, AuditReport, ClaimAudit};
pub use reporting::{
    AuditQuery, DateBasis, ExceptionCount, KpiOverview, MonthlyPayments, PayerScore, RiskLevel,
    ScorecardOrder,
};
pub use error::AuditError;
