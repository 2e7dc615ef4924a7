//! Tier-change screen: lifecycle, user operations and billing completions
//! around one [`Reconciler`](crate::reconciler::Reconciler).

mod config;
mod controller;

pub use config::{ScreenConfig, DEFAULT_SELECTION_SLOT};
pub use controller::TierScreen;
