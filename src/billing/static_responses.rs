//! Reserved product ids with canned store responses.
//!
//! Purchasing one of these never charges anything; the store answers with a
//! fixed result so purchase flows can be exercised without a real catalog.

use super::response::ResponseCode;
use crate::types::{PurchaseState, SkuDetails, SkuId};

pub const PURCHASED: &str = "android.test.purchased";
pub const CANCELED: &str = "android.test.canceled";
pub const REFUNDED: &str = "android.test.refunded";
pub const ITEM_UNAVAILABLE: &str = "android.test.item_unavailable";

/// Canned result of purchasing a reserved id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaticResponse {
    /// The purchase succeeds and is recorded in the given state.
    Completes(PurchaseState),
    /// The purchase fails with the given code.
    Fails(ResponseCode),
}

/// Canned response for `code`, or `None` if it is not a reserved id.
pub fn lookup(code: &str) -> Option<StaticResponse> {
    match code {
        PURCHASED => Some(StaticResponse::Completes(PurchaseState::Purchased)),
        REFUNDED => Some(StaticResponse::Completes(PurchaseState::Refunded)),
        CANCELED => Some(StaticResponse::Fails(ResponseCode::UserCanceled)),
        ITEM_UNAVAILABLE => Some(StaticResponse::Fails(ResponseCode::ItemUnavailable)),
        _ => None,
    }
}

pub fn is_reserved(code: &str) -> bool {
    lookup(code).is_some()
}

/// Catalog entries for the reserved ids, as one-time products.
pub fn catalog() -> Vec<SkuDetails> {
    [PURCHASED, CANCELED, REFUNDED, ITEM_UNAVAILABLE]
        .into_iter()
        .map(|code| {
            SkuDetails::new(SkuId::in_app(code), code)
                .with_description("Static test response")
                .with_price("$0.99", 990_000, "USD")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            lookup(PURCHASED),
            Some(StaticResponse::Completes(PurchaseState::Purchased))
        );
        assert_eq!(
            lookup(CANCELED),
            Some(StaticResponse::Fails(ResponseCode::UserCanceled))
        );
        assert!(lookup("gas").is_none());
        assert!(is_reserved(REFUNDED));
    }

    #[test]
    fn test_catalog_is_in_app() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().all(|d| d.id.family == crate::types::ProductFamily::InApp));
    }
}
