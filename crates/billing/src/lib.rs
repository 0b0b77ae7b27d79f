//! Billings domain module.
//!
//! This crate contains the billing workflow state machine, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod billing;

pub use billing::{Billing, BillingState, BriefInfo};
