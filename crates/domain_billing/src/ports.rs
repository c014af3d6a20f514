//! Claim Financials Ports
//!
//! Ingestion boundary for raw transaction rows. Sources may deliver the
//! complete history or only new rows; the fact store treats re-deliveries as
//! no-ops, so either is safe.

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::transaction::RawTransactionRecord;

/// Source of raw transaction rows
#[async_trait]
pub trait TransactionSource: DomainPort {
    /// Loads the current batch of raw transactions
    async fn load_transactions(&self) -> Result<Vec<RawTransactionRecord>, PortError>;
}

/// In-memory implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default, Clone)]
    pub struct MockTransactionSource {
        records: Arc<RwLock<Vec<RawTransactionRecord>>>,
        unavailable: Arc<RwLock<bool>>,
    }

    impl MockTransactionSource {
        pub fn new(records: Vec<RawTransactionRecord>) -> Self {
            Self {
                records: Arc::new(RwLock::new(records)),
                unavailable: Arc::default(),
            }
        }

        /// Replaces the batch returned by the next load
        pub async fn set_records(&self, records: Vec<RawTransactionRecord>) {
            *self.records.write().await = records;
        }

        /// Appends rows to the batch, as an incremental feed would
        pub async fn push(&self, record: RawTransactionRecord) {
            self.records.write().await.push(record);
        }

        pub async fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.write().await = unavailable;
        }
    }

    impl DomainPort for MockTransactionSource {}

    #[async_trait]
    impl TransactionSource for MockTransactionSource {
        async fn load_transactions(&self) -> Result<Vec<RawTransactionRecord>, PortError> {
            if *self.unavailable.read().await {
                return Err(PortError::ServiceUnavailable {
                    service: "mock-transaction-source".to_string(),
                });
            }
            Ok(self.records.read().await.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransactionSource;
    use super::*;

    #[tokio::test]
    async fn test_mock_source_accumulates_pushes() {
        let source = MockTransactionSource::default();
        source.push(RawTransactionRecord::default()).await;
        source.push(RawTransactionRecord::default()).await;
        assert_eq!(source.load_transactions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_source_unavailable() {
        let source = MockTransactionSource::default();
        source.set_unavailable(true).await;
        assert!(source.load_transactions().await.unwrap_err().is_transient());
    }
}
