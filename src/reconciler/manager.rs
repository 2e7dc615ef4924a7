//! Reconciler state machine.

use super::gate::is_change_enabled;
use crate::inventory::{OwnedView, TargetCatalog};
use crate::selection::{PendingRestore, SelectionSet};
use crate::types::{Fingerprint, ProductFamily, SkuDetails, SkuId, Snapshot};
use tracing::{debug, info};

/// A tier change the gate currently allows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Selected owned subscriptions to replace.
    pub from: Vec<SkuId>,
    /// Tier to switch to.
    pub to: SkuDetails,
}

/// Tracks owned subscriptions of one family and the user's selection among them.
///
/// Owned exclusively by one screen instance and driven from its control
/// thread. After every [`reconcile`](Self::reconcile) the selection is a
/// subset of the owned view.
#[derive(Debug)]
pub struct Reconciler {
    family: ProductFamily,
    owned: OwnedView,
    selection: SelectionSet,
    pending: PendingRestore,
    targets: TargetCatalog,
    /// At least one snapshot has been reconciled.
    loaded: bool,
    supported: bool,
    last_fingerprint: Option<Fingerprint>,
}

impl Reconciler {
    /// Create an empty reconciler for `family`.
    pub fn new(family: ProductFamily) -> Self {
        Self {
            family,
            owned: OwnedView::new(),
            selection: SelectionSet::new(),
            pending: PendingRestore::new(),
            targets: TargetCatalog::new(),
            loaded: false,
            supported: false,
            last_fingerprint: None,
        }
    }

    /// Apply a snapshot. Returns true if the selection gained or lost an entry.
    ///
    /// On the first snapshot, buffered restore codes are merged against the new
    /// owned view and the buffer is cleared whether or not they matched. On
    /// every other snapshot the selection is pruned to what is still owned.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> bool {
        let fingerprint = snapshot.fingerprint();
        if self.last_fingerprint == Some(fingerprint) {
            debug!(
                family = %self.family,
                fingerprint = %fingerprint.short(),
                "Snapshot redelivered"
            );
        }

        let (owned, dropped) = OwnedView::from_snapshot(snapshot, self.family);
        self.owned = owned;
        self.supported = snapshot.is_supported(self.family);

        let first_load = !self.loaded;
        self.loaded = true;

        let mut changed = self.prune();
        if first_load && !self.pending.is_empty() {
            changed |= self.merge_pending();
        }

        self.targets = TargetCatalog::from_snapshot(snapshot, self.family, &self.owned);
        self.last_fingerprint = Some(fingerprint);

        info!(
            family = %self.family,
            fingerprint = %fingerprint.short(),
            owned = self.owned.len(),
            targets = self.targets.len(),
            selected = self.selection.len(),
            dropped,
            changed,
            "Reconciled inventory snapshot"
        );

        changed
    }

    /// Check or uncheck an owned subscription.
    ///
    /// Returns true if the selection's size changed. Ids outside the owned
    /// view are ignored and report no change.
    pub fn toggle(&mut self, id: &SkuId, checked: bool) -> bool {
        if checked && !self.owned.contains(id) {
            debug!(sku = %id, "Ignoring selection of a subscription that is not owned");
            return false;
        }
        self.selection.set(id, checked)
    }

    /// Selected codes to persist, or `None` when nothing is selected.
    pub fn snapshot_for_persistence(&self) -> Option<Vec<String>> {
        if self.selection.is_empty() {
            None
        } else {
            Some(self.selection.codes())
        }
    }

    /// Buffer persisted codes for merging into the selection.
    ///
    /// If a snapshot has already been reconciled the merge happens right away
    /// against the current owned view. Returns true if the selection changed.
    pub fn restore<I, S>(&mut self, codes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.fill(codes);
        if self.loaded && !self.pending.is_empty() {
            self.merge_pending()
        } else {
            false
        }
    }

    /// Move buffered codes that match an owned entry into the selection and
    /// clear the buffer.
    fn merge_pending(&mut self) -> bool {
        let codes = self.pending.take();
        let mut added = 0;
        let mut discarded = 0;

        for code in &codes {
            match self.owned.find_by_code(code) {
                Some(entry) => {
                    if self.selection.set(entry.id(), true) {
                        added += 1;
                    }
                }
                None => discarded += 1,
            }
        }

        debug!(
            family = %self.family,
            restored = codes.len(),
            added,
            discarded,
            "Merged restored selection"
        );

        added > 0
    }

    /// Drop selected ids no longer in the owned view.
    fn prune(&mut self) -> bool {
        let owned = &self.owned;
        let removed = self.selection.retain(|id| owned.contains(id));
        if removed > 0 {
            debug!(family = %self.family, removed, "Pruned selection after ownership changed");
        }
        removed > 0
    }

    /// Whether the tier-change action is currently enabled.
    pub fn change_enabled(&self) -> bool {
        is_change_enabled(&self.owned, &self.selection, &self.targets)
    }

    /// Build a change request to `to_code` if the gate allows it.
    pub fn change_request(&self, to_code: &str) -> Option<ChangeRequest> {
        if !self.change_enabled() {
            return None;
        }
        let to = self.targets.find_by_code(to_code)?.clone();
        let from = self
            .selection
            .iter()
            .filter(|id| self.owned.contains(id))
            .cloned()
            .collect();
        Some(ChangeRequest { from, to })
    }

    pub fn family(&self) -> ProductFamily {
        self.family
    }

    pub fn owned(&self) -> &OwnedView {
        &self.owned
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn targets(&self) -> &TargetCatalog {
        &self.targets
    }

    pub fn pending_restore(&self) -> &PendingRestore {
        &self.pending
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the last snapshot reported the family as supported.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        self.last_fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Purchase;

    fn snapshot(owned: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::new().with_support(ProductFamily::Subscription, true);
        for code in ["sub_01", "sub_02", "sub_03"] {
            snapshot = snapshot.with_sku(SkuDetails::new(SkuId::subscription(code), code));
        }
        for code in owned {
            snapshot =
                snapshot.with_purchase(Purchase::purchased(SkuId::subscription(*code), *code));
        }
        snapshot
    }

    fn sub(code: &str) -> SkuId {
        SkuId::subscription(code)
    }

    #[test]
    fn test_new_is_unloaded() {
        let reconciler = Reconciler::new(ProductFamily::Subscription);
        assert!(!reconciler.is_loaded());
        assert!(reconciler.owned().is_empty());
        assert!(!reconciler.change_enabled());
        assert!(reconciler.snapshot_for_persistence().is_none());
    }

    #[test]
    fn test_reconcile_builds_views() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        let changed = reconciler.reconcile(&snapshot(&["sub_02"]));

        assert!(!changed);
        assert!(reconciler.is_loaded());
        assert!(reconciler.is_supported());
        assert_eq!(reconciler.owned().codes(), vec!["sub_02"]);
        assert_eq!(reconciler.targets().codes(), vec!["sub_01", "sub_03"]);
        assert!(reconciler.last_fingerprint().is_some());
    }

    #[test]
    fn test_toggle_requires_ownership() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.reconcile(&snapshot(&["sub_01"]));

        assert!(!reconciler.toggle(&sub("sub_02"), true));
        assert!(reconciler.toggle(&sub("sub_01"), true));
        assert!(!reconciler.toggle(&sub("sub_01"), true));
        assert!(reconciler.toggle(&sub("sub_01"), false));
        assert!(reconciler.selection().is_empty());
    }

    #[test]
    fn test_revocation_prunes_selection() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.reconcile(&snapshot(&["sub_01", "sub_02"]));
        reconciler.toggle(&sub("sub_01"), true);
        reconciler.toggle(&sub("sub_02"), true);

        assert!(reconciler.reconcile(&snapshot(&["sub_02"])));
        assert_eq!(reconciler.selection().codes(), vec!["sub_02"]);
        assert!(!reconciler.reconcile(&snapshot(&["sub_02"])));
    }

    #[test]
    fn test_restore_before_first_load() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        assert!(!reconciler.restore(["sub_01", "sub_09"]));
        assert_eq!(reconciler.pending_restore().len(), 2);

        assert!(reconciler.reconcile(&snapshot(&["sub_01"])));
        assert_eq!(reconciler.selection().codes(), vec!["sub_01"]);
        assert!(reconciler.pending_restore().is_empty());
    }

    #[test]
    fn test_restore_after_load_merges_immediately() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.reconcile(&snapshot(&["sub_01", "sub_03"]));

        assert!(reconciler.restore(vec!["sub_03".to_string()]));
        assert_eq!(reconciler.selection().codes(), vec!["sub_03"]);
        assert!(reconciler.pending_restore().is_empty());
    }

    #[test]
    fn test_unmatched_restore_is_not_retried() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.restore(["sub_02"]);
        assert!(!reconciler.reconcile(&snapshot(&["sub_01"])));

        // sub_02 shows up later; the restored code is gone by then
        assert!(!reconciler.reconcile(&snapshot(&["sub_01", "sub_02"])));
        assert!(reconciler.selection().is_empty());
    }

    #[test]
    fn test_change_request() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.reconcile(&snapshot(&["sub_01"]));
        assert!(reconciler.change_request("sub_02").is_none());

        reconciler.toggle(&sub("sub_01"), true);
        let request = reconciler.change_request("sub_02").unwrap();
        assert_eq!(request.from, vec![sub("sub_01")]);
        assert_eq!(request.to.id, sub("sub_02"));

        // Owned tiers are not targets
        assert!(reconciler.change_request("sub_01").is_none());
    }

    #[test]
    fn test_unsupported_snapshot_disables_everything() {
        let mut reconciler = Reconciler::new(ProductFamily::Subscription);
        reconciler.reconcile(&snapshot(&["sub_01"]));
        reconciler.toggle(&sub("sub_01"), true);

        let unsupported = snapshot(&["sub_01"]).with_support(ProductFamily::Subscription, false);
        assert!(reconciler.reconcile(&unsupported));
        assert!(!reconciler.is_supported());
        assert!(reconciler.owned().is_empty());
        assert!(reconciler.targets().is_empty());
        assert!(!reconciler.change_enabled());
    }
}
