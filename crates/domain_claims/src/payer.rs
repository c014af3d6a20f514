//! Payer dimension
//!
//! A static lookup keyed by payer id. Consumers join it against audit rows
//! at read time; the pipeline only uses it to decide whether a claim's
//! payer reference resolves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::PayerId;
use crate::error::ClaimError;

/// Display name used when a payer reference is missing or does not resolve
pub const UNKNOWN_PAYER_NAME: &str = "Other / Unknown";

/// A payer (insurer) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub payer_id: PayerId,
    pub payer_name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Payer {
    /// Creates a payer without metadata
    pub fn new(payer_id: PayerId, payer_name: impl Into<String>) -> Self {
        Self {
            payer_id,
            payer_name: payer_name.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The payer lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayerDimension {
    payers: BTreeMap<PayerId, Payer>,
}

impl PayerDimension {
    /// Creates an empty dimension
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the dimension, rejecting duplicate payer ids
    pub fn from_payers(payers: impl IntoIterator<Item = Payer>) -> Result<Self, ClaimError> {
        let mut dimension = Self::new();
        for payer in payers {
            dimension.insert(payer)?;
        }
        Ok(dimension)
    }

    /// Adds a payer
    pub fn insert(&mut self, payer: Payer) -> Result<(), ClaimError> {
        if self.payers.contains_key(&payer.payer_id) {
            return Err(ClaimError::DuplicatePayer(payer.payer_id.to_string()));
        }
        self.payers.insert(payer.payer_id.clone(), payer);
        Ok(())
    }

    /// Looks up a payer
    pub fn get(&self, payer_id: &PayerId) -> Option<&Payer> {
        self.payers.get(payer_id)
    }

    /// Returns true if the payer id resolves
    pub fn contains(&self, payer_id: &PayerId) -> bool {
        self.payers.contains_key(payer_id)
    }

    /// Display name for an optional payer reference, with the unknown fallback
    pub fn name_for(&self, payer_id: Option<&PayerId>) -> &str {
        payer_id
            .and_then(|id| self.get(id))
            .map(|p| p.payer_name.as_str())
            .unwrap_or(UNKNOWN_PAYER_NAME)
    }

    /// Iterates payers in payer id order
    pub fn iter(&self) -> impl Iterator<Item = &Payer> {
        self.payers.values()
    }

    pub fn len(&self) -> usize {
        self.payers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payer(id: &str, name: &str) -> Payer {
        Payer::new(PayerId::new(id).unwrap(), name)
    }

    #[test]
    fn test_duplicate_payer_rejected() {
        let result = PayerDimension::from_payers(vec![
            payer("P1", "Medicare"),
            payer("P1", "Medicaid"),
        ]);
        assert_eq!(result, Err(ClaimError::DuplicatePayer("P1".to_string())));
    }

    #[test]
    fn test_name_for_falls_back_to_unknown() {
        let dim = PayerDimension::from_payers(vec![payer("P1", "Medicare")]).unwrap();
        let known = PayerId::new("P1").unwrap();
        let unknown = PayerId::new("P9").unwrap();

        assert_eq!(dim.name_for(Some(&known)), "Medicare");
        assert_eq!(dim.name_for(Some(&unknown)), UNKNOWN_PAYER_NAME);
        assert_eq!(dim.name_for(None), UNKNOWN_PAYER_NAME);
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let dim = PayerDimension::from_payers(vec![
            payer("P2", "Humana"),
            payer("P1", "Medicare"),
        ])
        .unwrap();
        let names: Vec<&str> = dim.iter().map(|p| p.payer_name.as_str()).collect();
        assert_eq!(names, vec!["Medicare", "Humana"]);
    }
}
