//! Report DTOs

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, RunId};
use domain_audit::ScorecardOrder;

/// A report together with the run it was computed from
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse<T> {
    /// Run that published the snapshot, absent before the first run
    pub run_id: Option<RunId>,
    pub currency: Currency,
    pub data: T,
}

/// Ordering and size of the payer scorecard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorecardParams {
    pub order: Option<ScorecardOrder>,
    pub top: Option<usize>,
}
