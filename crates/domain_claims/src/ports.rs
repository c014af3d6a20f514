//! Claims Domain Ports
//!
//! Ingestion boundaries for raw claim records and the payer dimension.
//! Adapters deliver full or incremental batches; the resolver does not care
//! which, because it always recomputes from everything it is given.
//!
//! # Usage
//!
//! ```rust,ignore
//! let records = claim_source.load_claims().await?;
//! let payers = payer_source.load_payers().await?;
//! let dimension = PayerDimension::from_payers(payers)?;
//! let resolved = ClaimsContextResolver::new(&dimension, Currency::USD).resolve(records);
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::payer::Payer;
use crate::source::RawClaimRecord;

/// Source of raw claim records
#[async_trait]
pub trait ClaimSource: DomainPort {
    /// Loads the current batch of raw claim records
    async fn load_claims(&self) -> Result<Vec<RawClaimRecord>, PortError>;
}

/// Source of payer dimension records
#[async_trait]
pub trait PayerSource: DomainPort {
    /// Loads every payer
    async fn load_payers(&self) -> Result<Vec<Payer>, PortError>;
}

/// In-memory implementations of the claims ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory claim source whose batch can be replaced between runs
    #[derive(Debug, Default, Clone)]
    pub struct MockClaimSource {
        records: Arc<RwLock<Vec<RawClaimRecord>>>,
        unavailable: Arc<RwLock<bool>>,
    }

    impl MockClaimSource {
        pub fn new(records: Vec<RawClaimRecord>) -> Self {
            Self {
                records: Arc::new(RwLock::new(records)),
                unavailable: Arc::default(),
            }
        }

        /// Replaces the batch returned by the next load
        pub async fn set_records(&self, records: Vec<RawClaimRecord>) {
            *self.records.write().await = records;
        }

        /// Makes subsequent loads fail as if the source were down
        pub async fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.write().await = unavailable;
        }
    }

    impl DomainPort for MockClaimSource {}

    #[async_trait]
    impl ClaimSource for MockClaimSource {
        async fn load_claims(&self) -> Result<Vec<RawClaimRecord>, PortError> {
            if *self.unavailable.read().await {
                return Err(PortError::ServiceUnavailable {
                    service: "mock-claim-source".to_string(),
                });
            }
            Ok(self.records.read().await.clone())
        }
    }

    /// In-memory payer source
    #[derive(Debug, Default, Clone)]
    pub struct MockPayerSource {
        payers: Arc<RwLock<Vec<Payer>>>,
    }

    impl MockPayerSource {
        pub fn new(payers: Vec<Payer>) -> Self {
            Self {
                payers: Arc::new(RwLock::new(payers)),
            }
        }
    }

    impl DomainPort for MockPayerSource {}

    #[async_trait]
    impl PayerSource for MockPayerSource {
        async fn load_payers(&self) -> Result<Vec<Payer>, PortError> {
            Ok(self.payers.read().await.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[tokio::test]
    async fn test_mock_claim_source_replaces_batch() {
        let source = MockClaimSource::new(vec![RawClaimRecord::with_claim_id("C1")]);
        assert_eq!(source.load_claims().await.unwrap().len(), 1);

        source.set_records(vec![]).await;
        assert!(source.load_claims().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_claim_source_unavailable() {
        let source = MockClaimSource::new(vec![]);
        source.set_unavailable(true).await;
        let err = source.load_claims().await.unwrap_err();
        assert!(err.is_transient());
    }
}
