//! # Billing Reconciler
//!
//! Keeps a user's tier-change selection consistent with what the billing
//! service reports as owned, across asynchronous inventory reloads,
//! configuration changes and purchase/change/revoke mutations.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Immutable inventory results; each one supersedes the last
//! - **Owned view**: Subscriptions the latest snapshot reports as purchased
//! - **Selection**: Owned subscriptions the user checked for a tier change
//! - **Restore**: Selection codes from saved state, merged once on first load
//! - **Gate**: Tier change is enabled iff something is selected and something
//!   is left to switch to
//!
//! ## Example
//!
//! ```ignore
//! use billing_reconciler::{FakeBillingService, ScreenConfig, TierScreen, EventFilter};
//!
//! let service = Arc::new(FakeBillingService::new().with_catalog(tiers));
//! let mut screen = TierScreen::new(ScreenConfig::default(), service.clone())?;
//! let events = screen.subscribe(EventFilter::selection());
//!
//! screen.resume(&saved_state);
//! screen.start();
//!
//! // Later, on the control thread
//! screen.pump();
//! screen.toggle("sub_01", true);
//! screen.change_tier("sub_02")?;
//! ```

pub mod billing;
pub mod error;
pub mod inventory;
pub mod observers;
pub mod persistence;
pub mod reconciler;
pub mod screen;
pub mod selection;
pub mod types;

// Re-exports
pub use billing::{
    BillingClient, Completion, CompletionSender, FailureKind, FakeBillingService,
    InventoryRequest, Operation, Outcome, Recovery, ResponseCode, Ticket,
};
pub use error::{BillingError, Result};
pub use inventory::{OwnedSubscription, OwnedView, TargetCatalog};
pub use observers::{
    DetachReason, EventFilter, ObserverConfig, ObserverHandle, ObserverId, ObserverManager,
    ScreenEvent,
};
pub use persistence::{SavedState, StateFile};
pub use reconciler::{is_change_enabled, ChangeRequest, Reconciler};
pub use screen::{ScreenConfig, TierScreen, DEFAULT_SELECTION_SLOT};
pub use selection::{PendingRestore, SelectionSet};
pub use types::*;
