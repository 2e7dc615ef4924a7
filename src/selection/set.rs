//! Set of owned subscriptions checked for a tier change.

use crate::types::SkuId;
use std::collections::BTreeSet;

/// Subscriptions the user has checked for a tier change.
///
/// Ordered by [`SkuId`] so that persisted codes come out deterministically.
/// Membership in the owned view is enforced by the reconciler, not here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<SkuId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `id`. Returns true if the set's size changed.
    pub fn set(&mut self, id: &SkuId, checked: bool) -> bool {
        if checked {
            self.ids.insert(id.clone())
        } else {
            self.ids.remove(id)
        }
    }

    pub fn contains(&self, id: &SkuId) -> bool {
        self.ids.contains(id)
    }

    /// Keep only ids for which `keep` returns true. Returns how many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&SkuId) -> bool,
    {
        let before = self.ids.len();
        self.ids.retain(|id| keep(id));
        before - self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuId> {
        self.ids.iter()
    }

    /// Codes of the selected ids, in set order.
    pub fn codes(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.code.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_size_change() {
        let mut set = SelectionSet::new();
        let id = SkuId::subscription("sub_01");

        assert!(set.set(&id, true));
        // Double tap
        assert!(!set.set(&id, true));
        assert_eq!(set.len(), 1);

        assert!(set.set(&id, false));
        assert!(!set.set(&id, false));
        assert!(set.is_empty());
    }

    #[test]
    fn test_retain_counts_removals() {
        let mut set = SelectionSet::new();
        set.set(&SkuId::subscription("sub_01"), true);
        set.set(&SkuId::subscription("sub_02"), true);
        set.set(&SkuId::subscription("sub_03"), true);

        let removed = set.retain(|id| id.code != "sub_02");
        assert_eq!(removed, 1);
        assert_eq!(set.codes(), vec!["sub_01", "sub_03"]);
    }
}
