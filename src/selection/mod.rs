//! User selection state: the checked owned subscriptions and the codes
//! waiting to be restored from saved state.

mod restore;
mod set;

pub use restore::PendingRestore;
pub use set::SelectionSet;
