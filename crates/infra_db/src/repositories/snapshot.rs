//! Pipeline state and published snapshot repository
//!
//! Owns every table the pipeline writes. [`SnapshotRepository::publish`]
//! rewrites them inside a single database transaction, so readers on other
//! connections keep seeing the previous run until it commits. Reads that
//! span several tables run in one `REPEATABLE READ` transaction so they all
//! see the same run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::Postgres;
use sqlx::types::{Json, Uuid};
use sqlx::{PgConnection, PgPool, QueryBuilder};
use tracing::{debug, info, instrument, warn};

use app_pipeline::{AuditView, FactState, RunCommit, RunReport};
use core_kernel::{ClaimId, Currency, Money, RunId, TransactionId};
use domain_audit::{AuditQuery, ClaimAudit, DateBasis};
use domain_billing::{ClaimFinancialSummary, Transaction, TransactionType};
use domain_claims::{Payer, RawClaimRecord, UNKNOWN_PAYER_NAME};

use crate::error::DatabaseError;
use crate::repositories::sources::PayerRow;

/// Rows per multi-row INSERT, well under the 65535 bind parameter limit
const INSERT_CHUNK: usize = 1_000;

/// Advisory lock held by a publishing transaction
const PUBLISH_LOCK: i64 = 0x636c_6169_6d73;

/// Table holding appended facts
pub const FACTS_TABLE: &str = "transaction_facts";
/// Table holding transactions whose claim is not resolved yet
pub const ORPHANS_TABLE: &str = "transaction_orphans";

/// Repository over the pipeline-owned tables
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    /// Creates a new SnapshotRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the state the last published run left behind
    pub async fn load_state(&self) -> Result<FactState, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        begin_snapshot_read(&mut tx).await?;

        let facts = select_transactions(&mut tx, FACTS_TABLE).await?;
        let orphans = select_transactions(&mut tx, ORPHANS_TABLE).await?;
        let claim_records = select_claim_records(&mut tx).await?;
        let base_run = select_latest_run_id(&mut tx).await?;
        tx.commit().await?;

        Ok(FactState {
            facts,
            orphans,
            claim_records,
            base_run,
        })
    }

    /// Publishes a run, all or nothing
    ///
    /// Facts are append-only and keep the first stored version of a
    /// transaction id. Every other table is replaced wholesale. Publishers
    /// queue on an advisory lock, and a commit whose base run is no longer
    /// the latest fails with [`DatabaseError::StaleCommit`].
    #[instrument(skip_all, fields(run_id = %commit.report.run_id))]
    pub async fn publish(&self, commit: &RunCommit) -> Result<(), DatabaseError> {
        let output = &commit.output;
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PUBLISH_LOCK)
            .execute(&mut *tx)
            .await?;
        let current = select_latest_run_id(&mut tx).await?;
        if current != commit.base_run {
            warn!(current = ?current, base = ?commit.base_run, "Stale commit rejected");
            return Err(DatabaseError::StaleCommit {
                run_id: commit.report.run_id,
                base_run: commit.base_run,
                current,
            });
        }

        insert_transactions(&mut tx, FACTS_TABLE, &output.facts, true).await?;

        sqlx::query("DELETE FROM transaction_orphans")
            .execute(&mut *tx)
            .await?;
        insert_transactions(&mut tx, ORPHANS_TABLE, &output.orphans, false).await?;

        sqlx::query("DELETE FROM claim_records")
            .execute(&mut *tx)
            .await?;
        insert_claim_records(&mut tx, &output.claim_records).await?;

        sqlx::query("DELETE FROM claim_financial_summaries")
            .execute(&mut *tx)
            .await?;
        insert_summaries(&mut tx, &output.summaries).await?;

        sqlx::query("DELETE FROM published_payers")
            .execute(&mut *tx)
            .await?;
        insert_payers(&mut tx, &output.payers).await?;

        sqlx::query("DELETE FROM claims_audit")
            .execute(&mut *tx)
            .await?;
        insert_audits(&mut tx, &output.audits).await?;

        sqlx::query(
            "INSERT INTO pipeline_runs (run_id, started_at, completed_at, report) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(*commit.report.run_id.as_uuid())
        .bind(commit.report.started_at)
        .bind(commit.report.completed_at)
        .bind(Json(&commit.report))
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        info!(
            facts = output.facts.len(),
            orphans = output.orphans.len(),
            claims = output.claim_records.len(),
            audits = output.audits.len(),
            "Snapshot published"
        );
        Ok(())
    }

    /// Audit rows matching the query, ordered by claim id
    pub async fn find_audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        select_audits(&mut conn, query).await
    }

    /// The audit row of one claim
    pub async fn find_audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<ClaimAudit>>(
            "SELECT row_data FROM claims_audit WHERE claim_id = $1",
        )
        .bind(claim_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.0))
    }

    /// The payer dimension as of the published run
    pub async fn published_payers(&self) -> Result<Vec<Payer>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        select_published_payers(&mut conn).await
    }

    /// Report of the most recently committed run
    pub async fn latest_run(&self) -> Result<Option<RunReport>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        select_latest_run(&mut conn).await
    }

    /// Matching audit rows, payers and run report from one database snapshot
    pub async fn read_view(&self, query: &AuditQuery) -> Result<AuditView, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        begin_snapshot_read(&mut tx).await?;

        let audits = select_audits(&mut tx, query).await?;
        let payers = select_published_payers(&mut tx).await?;
        let latest_run = select_latest_run(&mut tx).await?;
        tx.commit().await?;

        Ok(AuditView {
            audits,
            payers,
            latest_run,
        })
    }

    /// Verifies the connection pool can serve a query
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Readers
// ============================================================================

/// Pins every following statement of the transaction to one snapshot
async fn begin_snapshot_read(conn: &mut PgConnection) -> Result<(), DatabaseError> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn select_transactions(
    conn: &mut PgConnection,
    table: &'static str,
) -> Result<Vec<Transaction>, DatabaseError> {
    let sql = format!(
        "SELECT transaction_id, claim_id, transaction_type, amount, currency, \
         effective_date, posted_date FROM {table} ORDER BY transaction_id"
    );
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(|row| row.into_transaction(table)).collect()
}

async fn select_claim_records(conn: &mut PgConnection) -> Result<Vec<RawClaimRecord>, DatabaseError> {
    let rows = sqlx::query_scalar::<_, Json<RawClaimRecord>>(
        "SELECT record FROM claim_records ORDER BY claim_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Payer names come from the published payer snapshot; rows whose payer is
/// missing or unresolved match [`UNKNOWN_PAYER_NAME`].
async fn select_audits(
    conn: &mut PgConnection,
    query: &AuditQuery,
) -> Result<Vec<ClaimAudit>, DatabaseError> {
    let date_column = match query.date_basis {
        DateBasis::FirstTransaction => "a.first_transaction_date",
        DateBasis::Service => "a.service_date",
    };
    let sql = format!(
        r#"
        SELECT a.row_data
        FROM claims_audit a
        LEFT JOIN published_payers p ON p.payer_id = a.primary_payer_id
        WHERE ($1::date IS NULL OR {date_column} >= $1)
          AND ($2::date IS NULL OR {date_column} <= $2)
          AND (cardinality($3::text[]) = 0 OR a.exception_flag = ANY($3))
          AND (cardinality($4::text[]) = 0 OR COALESCE(p.payer_name, $5) = ANY($4))
        ORDER BY a.claim_id
        "#
    );
    let flags: Vec<String> = query
        .exception_flags
        .iter()
        .map(|flag| flag.code().to_string())
        .collect();

    let rows = sqlx::query_scalar::<_, Json<ClaimAudit>>(&sql)
        .bind(query.range.start)
        .bind(query.range.end)
        .bind(flags)
        .bind(query.payer_names.clone())
        .bind(UNKNOWN_PAYER_NAME)
        .fetch_all(&mut *conn)
        .await?;

    debug!(rows = rows.len(), "Audit rows selected");
    Ok(rows.into_iter().map(|row| row.0).collect())
}

async fn select_published_payers(conn: &mut PgConnection) -> Result<Vec<Payer>, DatabaseError> {
    let rows = sqlx::query_as::<_, PayerRow>(
        "SELECT payer_id, payer_name, metadata FROM published_payers ORDER BY payer_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| row.into_payer("published_payers"))
        .collect()
}

async fn select_latest_run(conn: &mut PgConnection) -> Result<Option<RunReport>, DatabaseError> {
    let report = sqlx::query_scalar::<_, Json<RunReport>>(
        "SELECT report FROM pipeline_runs ORDER BY completed_at DESC, run_id DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;

    Ok(report.map(|report| report.0))
}

async fn select_latest_run_id(conn: &mut PgConnection) -> Result<Option<RunId>, DatabaseError> {
    let run_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT run_id FROM pipeline_runs ORDER BY completed_at DESC, run_id DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;

    Ok(run_id.map(RunId::from))
}

// ============================================================================
// Bulk writers
// ============================================================================

async fn insert_transactions(
    conn: &mut PgConnection,
    table: &'static str,
    transactions: &[Transaction],
    keep_existing: bool,
) -> Result<(), DatabaseError> {
    for chunk in transactions.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (transaction_id, claim_id, transaction_type, amount, \
             currency, effective_date, posted_date) "
        ));
        builder.push_values(chunk, |mut row, t| {
            row.push_bind(t.transaction_id.as_str().to_string())
                .push_bind(t.claim_id.as_str().to_string())
                .push_bind(t.transaction_type.code())
                .push_bind(t.amount.amount())
                .push_bind(t.amount.currency().code())
                .push_bind(t.effective_date)
                .push_bind(t.posted_date);
        });
        if keep_existing {
            builder.push(" ON CONFLICT (transaction_id) DO NOTHING");
        }
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_claim_records(
    conn: &mut PgConnection,
    records: &[RawClaimRecord],
) -> Result<(), DatabaseError> {
    let keyed: Vec<(ClaimId, &RawClaimRecord)> = records
        .iter()
        .filter_map(|record| Some((ClaimId::from_optional(record.claim_id.as_deref())?, record)))
        .collect();
    for chunk in keyed.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO claim_records (claim_id, record) ");
        builder.push_values(chunk, |mut row, (claim_id, record)| {
            row.push_bind(claim_id.as_str().to_string())
                .push_bind(Json((*record).clone()));
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_summaries(
    conn: &mut PgConnection,
    summaries: &[ClaimFinancialSummary],
) -> Result<(), DatabaseError> {
    for chunk in summaries.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO claim_financial_summaries (claim_id, currency, total_charges, \
             total_payments, total_adjustments, total_transfers, total_transfers_in, \
             total_transfers_out, transaction_count, first_transaction_date, \
             last_transaction_date) ",
        );
        builder.push_values(chunk, |mut row, s| {
            row.push_bind(s.claim_id.as_str().to_string())
                .push_bind(s.total_charges.currency().code())
                .push_bind(s.total_charges.amount())
                .push_bind(s.total_payments.amount())
                .push_bind(s.total_adjustments.amount())
                .push_bind(s.total_transfers.amount())
                .push_bind(s.total_transfers_in.amount())
                .push_bind(s.total_transfers_out.amount())
                .push_bind(s.transaction_count as i64)
                .push_bind(s.first_transaction_date)
                .push_bind(s.last_transaction_date);
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_payers(conn: &mut PgConnection, payers: &[Payer]) -> Result<(), DatabaseError> {
    for chunk in payers.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO published_payers (payer_id, payer_name, metadata) ");
        builder.push_values(chunk, |mut row, payer| {
            let payer = PayerRow::from_payer(payer);
            row.push_bind(payer.payer_id)
                .push_bind(payer.payer_name)
                .push_bind(payer.metadata);
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_audits(conn: &mut PgConnection, audits: &[ClaimAudit]) -> Result<(), DatabaseError> {
    for chunk in audits.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO claims_audit (claim_id, primary_payer_id, service_date, \
             first_transaction_date, exception_flag, total_charges, total_payments, \
             net_variance, settlement_days, row_data) ",
        );
        builder.push_values(chunk, |mut row, audit| {
            row.push_bind(audit.claim_id.as_str().to_string())
                .push_bind(audit.primary_payer_id.as_ref().map(|id| id.as_str().to_string()))
                .push_bind(audit.service_date)
                .push_bind(audit.first_transaction_date)
                .push_bind(audit.exception_flag.code())
                .push_bind(audit.total_charges.amount())
                .push_bind(audit.total_payments.amount())
                .push_bind(audit.net_variance.amount())
                .push_bind(audit.settlement_days)
                .push_bind(Json(audit.clone()));
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

// ============================================================================
// Row types
// ============================================================================

/// A stored fact or orphan
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TransactionRow {
    pub transaction_id: String,
    pub claim_id: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub effective_date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
}

impl TransactionRow {
    /// Maps the row back onto a domain transaction
    pub fn into_transaction(self, table: &'static str) -> Result<Transaction, DatabaseError> {
        let transaction_id =
            TransactionId::new(&self.transaction_id).map_err(|e| DatabaseError::corrupt(table, e))?;
        let claim_id = ClaimId::new(&self.claim_id).map_err(|e| DatabaseError::corrupt(table, e))?;
        let transaction_type: TransactionType = self
            .transaction_type
            .parse()
            .map_err(|e| DatabaseError::corrupt(table, e))?;
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e| DatabaseError::corrupt(table, e))?;

        let mut transaction = Transaction::new(
            transaction_id,
            claim_id,
            transaction_type,
            Money::new(self.amount, currency),
            self.effective_date,
        );
        transaction.posted_date = self.posted_date;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(kind: &str) -> TransactionRow {
        TransactionRow {
            transaction_id: "T1".into(),
            claim_id: "C1".into(),
            transaction_type: kind.into(),
            amount: dec!(-12.345),
            currency: "USD".into(),
            effective_date: NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(),
            posted_date: NaiveDate::from_ymd_opt(2021, 1, 6),
        }
    }

    #[test]
    fn test_transaction_row_maps_to_domain() {
        let transaction = row("TRANSFER_OUT").into_transaction(FACTS_TABLE).unwrap();
        assert_eq!(transaction.transaction_type, TransactionType::TransferOut);
        assert_eq!(transaction.amount.amount(), dec!(-12.345));
        assert_eq!(transaction.amount.currency(), Currency::USD);
        assert_eq!(transaction.posted_date, NaiveDate::from_ymd_opt(2021, 1, 6));
    }

    #[test]
    fn test_unknown_stored_type_is_corrupt() {
        assert!(matches!(
            row("REFUND").into_transaction(ORPHANS_TABLE),
            Err(DatabaseError::CorruptRow { table: "transaction_orphans", .. })
        ));
    }

    #[test]
    fn test_unknown_stored_currency_is_corrupt() {
        let mut stored = row("CHARGE");
        stored.currency = "XYZ".into();
        assert!(stored.into_transaction(FACTS_TABLE).is_err());
    }

    proptest::proptest! {
        #[test]
        fn stored_amounts_keep_their_precision(units in -1_000_000_000i64..1_000_000_000, scale in 0u32..6) {
            let mut stored = row("ADJUSTMENT");
            stored.amount = Decimal::new(units, scale);
            let transaction = stored.into_transaction(FACTS_TABLE).unwrap();
            proptest::prop_assert_eq!(transaction.amount.amount(), Decimal::new(units, scale));
        }
    }
}
