//! Core Kernel - Foundational types for the claims audit pipeline
//!
//! This crate provides the building blocks shared by every pipeline stage:
//! - Money types with precise decimal arithmetic
//! - Calendar helpers for settlement durations and reporting windows
//! - Source-system keys and run identifiers
//! - Port abstractions for ingestion and materialization adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{DateRange, TemporalError, days_between};
pub use identifiers::{
    ClaimId, TransactionId, PayerId, PatientId, ProviderId, DepartmentId,
    AppointmentId, RunId, KeyError,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
