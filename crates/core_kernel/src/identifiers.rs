//! Strongly-typed identifiers for pipeline entities
//!
//! Claims, transactions and payers are keyed by the natural keys of the
//! source system, so those identifiers wrap a trimmed, non-empty string.
//! Pipeline runs are generated locally and use time-ordered UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error raised when a source key is blank
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} must not be blank")]
pub struct KeyError {
    pub kind: &'static str,
}

macro_rules! define_key {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a key from a source value, trimming surrounding whitespace
            pub fn new(value: impl AsRef<str>) -> Result<Self, KeyError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(KeyError { kind: $kind });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Builds a key from an optional source value, treating blanks as absent
            pub fn from_optional(value: Option<&str>) -> Option<Self> {
                value.and_then(|v| Self::new(v).ok())
            }

            /// Returns the key as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = KeyError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> String {
                key.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(ClaimId, "claim_id");
define_key!(TransactionId, "transaction_id");
define_key!(PayerId, "payer_id");
define_key!(PatientId, "patient_id");
define_key!(ProviderId, "provider_id");
define_key!(DepartmentId, "department_id");
define_key!(AppointmentId, "appointment_id");

/// Identifier of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new time-ordered run identifier (v7)
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RUN-{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid_str = s.strip_prefix("RUN-").unwrap_or(s);
        Ok(Self(Uuid::parse_str(uuid_str)?))
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
