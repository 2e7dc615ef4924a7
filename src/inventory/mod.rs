//! Views derived from an inventory snapshot.
//!
//! Both views are rebuilt from scratch for every snapshot; nothing carries
//! identity across reloads.

mod catalog;
mod owned;

pub use catalog::TargetCatalog;
pub use owned::{OwnedSubscription, OwnedView};
