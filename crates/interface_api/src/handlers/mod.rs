//! Request handlers

pub mod health;
pub mod audits;
pub mod reports;
pub mod runs;
