//! Billing service boundary.
//!
//! - [`BillingClient`]: asynchronous requests answered through a per-screen
//!   completion channel
//! - [`ResponseCode`] / [`FailureKind`] / [`Recovery`]: the closed failure
//!   taxonomy and one recovery policy per kind
//! - [`FakeBillingService`]: in-memory service with caller-controlled timing
//! - [`static_responses`]: reserved product ids with canned results

mod client;
mod fake;
mod response;
pub mod static_responses;

pub use client::{
    BillingClient, Completion, CompletionSender, InventoryRequest, Outcome, Ticket,
};
pub use fake::FakeBillingService;
pub use response::{FailureKind, Operation, Recovery, ResponseCode};
