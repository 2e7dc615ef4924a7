//! Subscription reconciliation.
//!
//! The [`Reconciler`] merges each incoming inventory snapshot with the locally
//! held selection and restore state, keeping the selection a subset of what
//! the store reports as owned. The [`is_change_enabled`] gate is derived from
//! the result.

mod gate;
mod manager;

pub use gate::is_change_enabled;
pub use manager::{ChangeRequest, Reconciler};
