//! Core types shared by the reconciler, the billing boundary and the screen.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Product family a SKU belongs to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductFamily {
    /// One-time (optionally consumable) products.
    #[serde(rename = "inapp")]
    InApp,
    /// Auto-renewing subscriptions.
    #[serde(rename = "subs")]
    Subscription,
}

impl ProductFamily {
    /// Store-side name of the family.
    pub fn as_str(self) -> &'static str {
        match self {
            ProductFamily::InApp => "inapp",
            ProductFamily::Subscription => "subs",
        }
    }
}

impl fmt::Debug for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a purchasable product: family plus code.
///
/// The code alone is what gets persisted; the family is implied by the
/// screen that restores it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkuId {
    pub family: ProductFamily,
    pub code: String,
}

impl SkuId {
    pub fn new(family: ProductFamily, code: impl Into<String>) -> Self {
        Self {
            family,
            code: code.into(),
        }
    }

    /// Shorthand for a subscription SKU.
    pub fn subscription(code: impl Into<String>) -> Self {
        Self::new(ProductFamily::Subscription, code)
    }

    /// Shorthand for an in-app SKU.
    pub fn in_app(code: impl Into<String>) -> Self {
        Self::new(ProductFamily::InApp, code)
    }
}

impl fmt::Debug for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkuId({}:{})", self.family, self.code)
    }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.code)
    }
}

/// Opaque token identifying a single purchase.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseToken(pub String);

impl fmt::Debug for PurchaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PurchaseToken({})", self.0)
    }
}

impl fmt::Display for PurchaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Timestamp(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Catalog entry for a SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuDetails {
    pub id: SkuId,
    pub title: String,
    pub description: String,
    /// Formatted price, e.g. "$4.99".
    pub price: String,
    pub price_micros: i64,
    pub currency: String,
}

impl SkuDetails {
    /// Minimal entry with an empty description and a zero price.
    pub fn new(id: SkuId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            price: String::new(),
            price_micros: 0,
            currency: String::new(),
        }
    }

    /// Set price fields.
    pub fn with_price(
        mut self,
        price: impl Into<String>,
        micros: i64,
        currency: impl Into<String>,
    ) -> Self {
        self.price = price.into();
        self.price_micros = micros;
        self.currency = currency.into();
        self
    }

    /// Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Store-side state of a purchase record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Purchased,
    Pending,
    Canceled,
    Refunded,
}

/// A purchase record as reported by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: SkuId,
    pub state: PurchaseState,
    pub token: PurchaseToken,
    pub order_id: String,
    pub purchase_time: Timestamp,
    pub auto_renewing: bool,
}

impl Purchase {
    /// A purchased record with the given token.
    pub fn purchased(id: SkuId, token: impl Into<String>) -> Self {
        let auto_renewing = id.family == ProductFamily::Subscription;
        Self {
            id,
            state: PurchaseState::Purchased,
            token: PurchaseToken(token.into()),
            order_id: String::new(),
            purchase_time: Timestamp::now(),
            auto_renewing,
        }
    }

    /// Override the state.
    pub fn with_state(mut self, state: PurchaseState) -> Self {
        self.state = state;
        self
    }

    pub fn is_purchased(&self) -> bool {
        self.state == PurchaseState::Purchased
    }
}

/// SHA-256 fingerprint of a snapshot's contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[0..4])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}...)", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Immutable point-in-time result of an inventory reload.
///
/// A snapshot fully supersedes any earlier one. Nothing guarantees that every
/// purchase record references a SKU present in `skus`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Per-family support flag. Families absent from the map are unsupported.
    pub supported: BTreeMap<ProductFamily, bool>,
    /// Full SKU catalog, in store order.
    pub skus: Vec<SkuDetails>,
    /// Purchase records in any state.
    pub purchases: Vec<Purchase>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a family as supported or not.
    pub fn with_support(mut self, family: ProductFamily, supported: bool) -> Self {
        self.supported.insert(family, supported);
        self
    }

    /// Append a catalog entry.
    pub fn with_sku(mut self, details: SkuDetails) -> Self {
        self.skus.push(details);
        self
    }

    /// Append a purchase record.
    pub fn with_purchase(mut self, purchase: Purchase) -> Self {
        self.purchases.push(purchase);
        self
    }

    pub fn is_supported(&self, family: ProductFamily) -> bool {
        self.supported.get(&family).copied().unwrap_or(false)
    }

    /// Look up a catalog entry.
    pub fn sku(&self, id: &SkuId) -> Option<&SkuDetails> {
        self.skus.iter().find(|details| &details.id == id)
    }

    /// Catalog entries of one family, in catalog order.
    pub fn skus_in(&self, family: ProductFamily) -> impl Iterator<Item = &SkuDetails> {
        self.skus.iter().filter(move |details| details.id.family == family)
    }

    /// Purchase records of one family, in record order.
    pub fn purchases_in(&self, family: ProductFamily) -> impl Iterator<Item = &Purchase> {
        self.purchases
            .iter()
            .filter(move |purchase| purchase.id.family == family)
    }

    /// SHA-256 over every field, in order. Equal snapshots share it and any
    /// field difference changes it.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();

        for (family, supported) in &self.supported {
            hasher.update(family.as_str().as_bytes());
            hasher.update([*supported as u8]);
        }
        hasher.update(b"\x00skus");
        for details in &self.skus {
            hash_sku_id(&mut hasher, &details.id);
            hash_str(&mut hasher, &details.title);
            hash_str(&mut hasher, &details.description);
            hash_str(&mut hasher, &details.price);
            hasher.update(details.price_micros.to_le_bytes());
            hash_str(&mut hasher, &details.currency);
        }
        hasher.update(b"\x00purchases");
        for purchase in &self.purchases {
            hash_sku_id(&mut hasher, &purchase.id);
            hash_str(&mut hasher, &format!("{:?}", purchase.state));
            hash_str(&mut hasher, &purchase.token.0);
            hash_str(&mut hasher, &purchase.order_id);
            hasher.update(purchase.purchase_time.0.to_le_bytes());
            hasher.update([purchase.auto_renewing as u8]);
        }

        Fingerprint(hasher.finalize().into())
    }
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_sku_id(hasher: &mut Sha256, id: &SkuId) {
    hash_str(hasher, id.family.as_str());
    hash_str(hasher, &id.code);
}
