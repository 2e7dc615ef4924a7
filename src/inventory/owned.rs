//! Owned-subscriptions view.

use crate::types::{ProductFamily, Purchase, PurchaseToken, SkuDetails, SkuId, Snapshot};
use std::collections::HashSet;
use tracing::debug;

/// A product the latest snapshot reports as purchased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedSubscription {
    pub details: SkuDetails,
    pub token: PurchaseToken,
    pub auto_renewing: bool,
}

impl OwnedSubscription {
    pub fn id(&self) -> &SkuId {
        &self.details.id
    }
}

/// Ordered list of owned products of one family, in purchase record order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnedView {
    entries: Vec<OwnedSubscription>,
}

impl OwnedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the view for `family` from a snapshot.
    ///
    /// Only records in the purchased state count. Records whose SKU is missing
    /// from the snapshot catalog are dropped; the second value is how many.
    /// A later record for an id already in the view is ignored.
    pub fn from_snapshot(snapshot: &Snapshot, family: ProductFamily) -> (Self, usize) {
        if !snapshot.is_supported(family) {
            return (Self::new(), 0);
        }

        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut dropped = 0;

        for purchase in snapshot.purchases_in(family).filter(|p| p.is_purchased()) {
            let Some(details) = snapshot.sku(&purchase.id) else {
                debug!(
                    sku = %purchase.id,
                    "Purchase references SKU missing from catalog, dropping"
                );
                dropped += 1;
                continue;
            };

            if !seen.insert(purchase.id.clone()) {
                continue;
            }

            entries.push(Self::entry(details, purchase));
        }

        (Self { entries }, dropped)
    }

    fn entry(details: &SkuDetails, purchase: &Purchase) -> OwnedSubscription {
        OwnedSubscription {
            details: details.clone(),
            token: purchase.token.clone(),
            auto_renewing: purchase.auto_renewing,
        }
    }

    pub fn contains(&self, id: &SkuId) -> bool {
        self.entries.iter().any(|entry| entry.id() == id)
    }

    /// Find an owned entry by its persisted code.
    pub fn find_by_code(&self, code: &str) -> Option<&OwnedSubscription> {
        self.entries.iter().find(|entry| entry.id().code == code)
    }

    pub fn get(&self, id: &SkuId) -> Option<&OwnedSubscription> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OwnedSubscription> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SkuId> {
        self.entries.iter().map(OwnedSubscription::id)
    }

    pub fn codes(&self) -> Vec<String> {
        self.ids().map(|id| id.code.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
