//! Pipeline runner
//!
//! One run loads every source, executes the four stages in order and
//! publishes the result through the [`PipelineStore`]. The stages
//! themselves live in [`execute`], a pure function of the source batch and
//! the carried-over fact state.
//!
//! ```text
//! load (concurrent) -> resolve claims -> ingest transactions
//!                   -> aggregate -> audit -> commit (atomic)
//! ```

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use core_kernel::{Currency, RunId};
use domain_audit::{build_audits, AuditReport, ClaimAudit};
use domain_billing::{
    ClaimFinancialAggregator, ClaimFinancialSummary, IngestionReport, RawTransactionRecord,
    Transaction, TransactionFactStore, TransactionSource,
};
use domain_claims::{
    ClaimSource, ClaimsContextResolver, Payer, PayerDimension, PayerSource, RawClaimRecord,
    ResolutionReport,
};

use crate::error::PipelineError;
use crate::ports::{FactState, PipelineStore, RunCommit};
use crate::report::RunReport;

/// Raw input of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    pub claims: Vec<RawClaimRecord>,
    pub transactions: Vec<RawTransactionRecord>,
    pub payers: Vec<Payer>,
}

/// Everything a run computes, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub resolution: ResolutionReport,
    pub ingestion: IngestionReport,
    pub audit: AuditReport,
    pub facts: Vec<Transaction>,
    pub orphans: Vec<Transaction>,
    /// Winning raw claim records, carried into the next run
    pub claim_records: Vec<RawClaimRecord>,
    pub summaries: Vec<ClaimFinancialSummary>,
    pub audits: Vec<ClaimAudit>,
    pub payers: Vec<Payer>,
}

/// Runs the four stages over one batch
///
/// The claim batch is merged onto `state.claim_records`, so claims resolved
/// by earlier runs stay in the output when the batch omits them.
///
/// # Errors
///
/// Fails on a payer dimension with duplicate ids and on arithmetic errors.
/// Malformed records, orphans and integrity violations are counted in the
/// output, not raised.
pub fn execute(
    batch: SourceBatch,
    state: FactState,
    currency: Currency,
) -> Result<RunOutput, PipelineError> {
    let payers = PayerDimension::from_payers(batch.payers)?;

    let mut resolved = ClaimsContextResolver::new(&payers, currency)
        .resolve_onto(state.claim_records, batch.claims);
    let claim_records = std::mem::take(&mut resolved.records);

    let mut store = TransactionFactStore::from_parts(state.facts, state.orphans);
    let ingestion = store.ingest_raw(batch.transactions, currency, |claim_id| {
        resolved.contains(claim_id)
    });

    let summaries = ClaimFinancialAggregator::new(currency)
        .aggregate(store.facts(), resolved.claims.keys())?;

    let audit = build_audits(&resolved.claims, &summaries)?;

    Ok(RunOutput {
        resolution: resolved.report,
        ingestion,
        audit: audit.report,
        facts: store.facts().cloned().collect(),
        orphans: store.orphans().cloned().collect(),
        claim_records,
        summaries: summaries.into_values().collect(),
        audits: audit.rows,
        payers: payers.iter().cloned().collect(),
    })
}

/// Wires sources and a store into runnable pipeline
#[derive(Clone)]
pub struct PipelineRunner {
    claims: Arc<dyn ClaimSource>,
    transactions: Arc<dyn TransactionSource>,
    payers: Arc<dyn PayerSource>,
    store: Arc<dyn PipelineStore>,
    currency: Currency,
}

impl PipelineRunner {
    pub fn new(
        claims: Arc<dyn ClaimSource>,
        transactions: Arc<dyn TransactionSource>,
        payers: Arc<dyn PayerSource>,
        store: Arc<dyn PipelineStore>,
        currency: Currency,
    ) -> Self {
        Self {
            claims,
            transactions,
            payers,
            store,
            currency,
        }
    }

    /// Executes one full run
    ///
    /// Nothing is published unless every step succeeds.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new_v7();
        tracing::Span::current().record("run_id", tracing::field::display(&run_id));
        let started_at = Utc::now();
        info!(currency = %self.currency, "Pipeline run started");

        let result = self.run_inner(run_id, started_at).await;
        match &result {
            Ok(report) => info!(
                audited = report.audit.audited_claims,
                orphans = report.orphans,
                excluded = report.excluded_records(),
                "Pipeline run committed"
            ),
            Err(PipelineError::Store(err)) if err.is_conflict() => {
                warn!(error = %err, "Another run committed first, its snapshot kept")
            }
            Err(err) => error!(error = %err, "Pipeline run aborted, previous snapshot kept"),
        }
        result
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<RunReport, PipelineError> {
        let (claims, transactions, payers, state) = tokio::try_join!(
            async {
                self.claims
                    .load_claims()
                    .await
                    .map_err(|e| PipelineError::source_failed("claims", e))
            },
            async {
                self.transactions
                    .load_transactions()
                    .await
                    .map_err(|e| PipelineError::source_failed("transactions", e))
            },
            async {
                self.payers
                    .load_payers()
                    .await
                    .map_err(|e| PipelineError::source_failed("payers", e))
            },
            async { self.store.load_state().await.map_err(PipelineError::Store) },
        )?;
        info!(
            claims = claims.len(),
            transactions = transactions.len(),
            payers = payers.len(),
            carried_facts = state.facts.len(),
            carried_orphans = state.orphans.len(),
            carried_claims = state.claim_records.len(),
            base_run = ?state.base_run,
            "Sources loaded"
        );

        let base_run = state.base_run;
        let batch = SourceBatch {
            claims,
            transactions,
            payers,
        };
        let output = execute(batch, state, self.currency)?;

        let report = RunReport::new(run_id, started_at, Utc::now(), self.currency, &output);
        self.store
            .commit(RunCommit {
                report: report.clone(),
                output,
                base_run,
            })
            .await
            .map_err(PipelineError::Store)?;
        Ok(report)
    }
}
