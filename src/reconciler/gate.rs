//! Availability gate for the tier-change action.

use crate::inventory::{OwnedView, TargetCatalog};
use crate::selection::SelectionSet;

/// Whether the tier-change action is enabled.
///
/// True iff there is at least one tier to switch to and at least one selected
/// subscription that is still owned.
pub fn is_change_enabled(
    owned: &OwnedView,
    selection: &SelectionSet,
    targets: &TargetCatalog,
) -> bool {
    !targets.is_empty() && selection.iter().any(|id| owned.contains(id))
}
