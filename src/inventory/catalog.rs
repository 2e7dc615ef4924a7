//! Target-tier catalog: tiers the user could switch to.

use super::OwnedView;
use crate::types::{ProductFamily, SkuDetails, SkuId, Snapshot};

/// Catalog entries of one family that are not currently owned, in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetCatalog {
    entries: Vec<SkuDetails>,
}

impl TargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the snapshot's catalog minus the owned view.
    pub fn from_snapshot(snapshot: &Snapshot, family: ProductFamily, owned: &OwnedView) -> Self {
        if !snapshot.is_supported(family) {
            return Self::new();
        }

        let entries = snapshot
            .skus_in(family)
            .filter(|details| !owned.contains(&details.id))
            .cloned()
            .collect();

        Self { entries }
    }

    pub fn contains(&self, id: &SkuId) -> bool {
        self.entries.iter().any(|details| &details.id == id)
    }

    /// Find a target by code.
    pub fn find_by_code(&self, code: &str) -> Option<&SkuDetails> {
        self.entries.iter().find(|details| details.id.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuDetails> {
        self.entries.iter()
    }

    pub fn codes(&self) -> Vec<String> {
        self.entries.iter().map(|details| details.id.code.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
