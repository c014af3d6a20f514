//! Source tables repository
//!
//! Reads raw claims, raw transactions and the payer dimension exactly as
//! they were loaded. Rows are returned in load order so the resolver's
//! "last delivered wins" tie-break matches the order records arrived in.

use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;

use core_kernel::PayerId;
use domain_billing::RawTransactionRecord;
use domain_claims::{Payer, RawClaimRecord};

use crate::error::DatabaseError;

/// Repository over the `raw_claims`, `raw_transactions` and `dim_payers` tables
#[derive(Debug, Clone)]
pub struct SourceRepository {
    pool: PgPool,
}

impl SourceRepository {
    /// Creates a new SourceRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads every raw claim row in load order
    pub async fn load_claims(&self) -> Result<Vec<RawClaimRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RawClaimRow>(
            r#"
            SELECT
                claim_id,
                patient_id,
                provider_id,
                supervising_provider_id,
                department_id,
                appointment_id,
                primary_payer_id,
                secondary_payer_id,
                service_date,
                claim_status,
                claim_type,
                outstanding_balance,
                diagnosis_codes,
                updated_at,
                ingest_sequence
            FROM raw_claims
            ORDER BY record_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Loads every raw transaction row in load order
    pub async fn load_transactions(&self) -> Result<Vec<RawTransactionRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RawTransactionRow>(
            r#"
            SELECT
                transaction_id,
                claim_id,
                transaction_type,
                amount,
                currency,
                effective_date,
                posted_date
            FROM raw_transactions
            ORDER BY record_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Loads the payer dimension ordered by payer id
    pub async fn load_payers(&self) -> Result<Vec<PayerRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PayerRow>(
            "SELECT payer_id, payer_name, metadata FROM dim_payers ORDER BY payer_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct RawClaimRow {
    pub claim_id: Option<String>,
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
    pub supervising_provider_id: Option<String>,
    pub department_id: Option<String>,
    pub appointment_id: Option<String>,
    pub primary_payer_id: Option<String>,
    pub secondary_payer_id: Option<String>,
    pub service_date: Option<String>,
    pub claim_status: Option<String>,
    pub claim_type: Option<String>,
    pub outstanding_balance: Option<String>,
    pub diagnosis_codes: Vec<String>,
    pub updated_at: Option<String>,
    pub ingest_sequence: Option<i64>,
}

impl From<RawClaimRow> for RawClaimRecord {
    fn from(row: RawClaimRow) -> Self {
        RawClaimRecord {
            claim_id: row.claim_id,
            patient_id: row.patient_id,
            provider_id: row.provider_id,
            supervising_provider_id: row.supervising_provider_id,
            department_id: row.department_id,
            appointment_id: row.appointment_id,
            primary_payer_id: row.primary_payer_id,
            secondary_payer_id: row.secondary_payer_id,
            service_date: row.service_date,
            claim_status: row.claim_status,
            claim_type: row.claim_type,
            outstanding_balance: row.outstanding_balance,
            diagnosis_codes: row.diagnosis_codes,
            updated_at: row.updated_at,
            // A negative sequence carries no ordering information.
            ingest_sequence: row.ingest_sequence.and_then(|seq| u64::try_from(seq).ok()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct RawTransactionRow {
    pub transaction_id: Option<String>,
    pub claim_id: Option<String>,
    pub transaction_type: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub effective_date: Option<String>,
    pub posted_date: Option<String>,
}

impl From<RawTransactionRow> for RawTransactionRecord {
    fn from(row: RawTransactionRow) -> Self {
        RawTransactionRecord {
            transaction_id: row.transaction_id,
            claim_id: row.claim_id,
            transaction_type: row.transaction_type,
            amount: row.amount,
            currency: row.currency,
            effective_date: row.effective_date,
            posted_date: row.posted_date,
        }
    }
}

/// Free-form payer attributes stored as a JSON object
pub type PayerMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PayerRow {
    pub payer_id: String,
    pub payer_name: String,
    pub metadata: Json<PayerMetadata>,
}

impl PayerRow {
    pub fn from_payer(payer: &Payer) -> Self {
        Self {
            payer_id: payer.payer_id.as_str().to_string(),
            payer_name: payer.payer_name.clone(),
            metadata: Json(payer.metadata.clone()),
        }
    }

    /// Maps the row onto a domain payer; a blank id is a corrupt row
    pub fn into_payer(self, table: &'static str) -> Result<Payer, DatabaseError> {
        let payer_id = PayerId::new(&self.payer_id).map_err(|e| DatabaseError::corrupt(table, e))?;
        Ok(Payer {
            payer_id,
            payer_name: self.payer_name,
            metadata: self.metadata.0,
        })
    }
}
