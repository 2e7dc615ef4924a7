//! Boundary to the billing service.
//!
//! Requests go out through [`BillingClient`]; results come back later as
//! [`Completion`]s on the channel the requester passed in. The requesting
//! screen drains that channel on its own control thread.

use super::response::{Operation, ResponseCode};
use crate::types::{ProductFamily, Purchase, PurchaseToken, SkuId, Snapshot};
use crossbeam_channel::Sender;
use std::fmt;
use tracing::debug;

/// Correlates a completion with the request that produced it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

impl Ticket {
    pub fn next(self) -> Self {
        Ticket(self.0 + 1)
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket({})", self.0)
    }
}

/// Inventory query for one product family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryRequest {
    pub family: ProductFamily,
    /// SKU codes whose details should be included.
    pub skus: Vec<String>,
}

impl InventoryRequest {
    pub fn new<I, S>(family: ProductFamily, skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            family,
            skus: skus.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Inventory(Result<Snapshot, ResponseCode>),
    Purchase {
        sku: SkuId,
        result: Result<Purchase, ResponseCode>,
    },
    ChangeSubscription {
        from: Vec<SkuId>,
        to: SkuId,
        result: Result<Purchase, ResponseCode>,
    },
    Consume {
        token: PurchaseToken,
        result: Result<(), ResponseCode>,
    },
}

impl Outcome {
    pub fn operation(&self) -> Operation {
        match self {
            Outcome::Inventory(_) => Operation::Reload,
            Outcome::Purchase { .. } => Operation::Purchase,
            Outcome::ChangeSubscription { .. } => Operation::ChangeSubscription,
            Outcome::Consume { .. } => Operation::Consume,
        }
    }

    /// Response code, `Ok` on success.
    pub fn response(&self) -> ResponseCode {
        let failed = match self {
            Outcome::Inventory(result) => result.as_ref().err(),
            Outcome::Purchase { result, .. } => result.as_ref().err(),
            Outcome::ChangeSubscription { result, .. } => result.as_ref().err(),
            Outcome::Consume { result, .. } => result.as_ref().err(),
        };
        failed.copied().unwrap_or(ResponseCode::Ok)
    }
}

/// A finished request delivered back to the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

/// Sending half of a screen's completion channel.
#[derive(Clone)]
pub struct CompletionSender {
    sender: Sender<Completion>,
}

impl CompletionSender {
    pub fn new(sender: Sender<Completion>) -> Self {
        Self { sender }
    }

    /// Deliver a completion. Returns false if the requester is gone, in which
    /// case the completion is discarded.
    pub fn deliver(&self, completion: Completion) -> bool {
        let ticket = completion.ticket;
        match self.sender.send(completion) {
            Ok(()) => true,
            Err(_) => {
                debug!(?ticket, "Requester closed, discarding completion");
                false
            }
        }
    }
}

/// Asynchronous billing service.
///
/// Every call returns immediately; the result arrives later through `reply`.
pub trait BillingClient: Send + Sync {
    /// Load catalog details and purchase records for a family.
    fn request_reload(&self, ticket: Ticket, request: InventoryRequest, reply: CompletionSender);

    /// Start a purchase flow for `sku`.
    fn request_purchase(&self, ticket: Ticket, sku: SkuId, reply: CompletionSender);

    /// Replace the owned subscriptions in `from` with `to`.
    fn request_change_subscription(
        &self,
        ticket: Ticket,
        from: Vec<SkuId>,
        to: SkuId,
        reply: CompletionSender,
    );

    /// Consume a one-time purchase so it can be bought again.
    fn request_consume(&self, ticket: Ticket, token: PurchaseToken, reply: CompletionSender);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_outcome_response() {
        let ok = Outcome::Inventory(Ok(Snapshot::new()));
        assert_eq!(ok.response(), ResponseCode::Ok);
        assert_eq!(ok.operation(), Operation::Reload);

        let failed = Outcome::Consume {
            token: PurchaseToken("t".into()),
            result: Err(ResponseCode::ItemNotOwned),
        };
        assert_eq!(failed.response(), ResponseCode::ItemNotOwned);
        assert_eq!(failed.operation(), Operation::Consume);
    }

    #[test]
    fn test_deliver_to_closed_requester() {
        let (sender, receiver) = unbounded();
        let reply = CompletionSender::new(sender);
        let completion = Completion {
            ticket: Ticket(1),
            outcome: Outcome::Inventory(Err(ResponseCode::ServiceUnavailable)),
        };

        assert!(reply.deliver(completion.clone()));
        assert_eq!(receiver.try_recv().unwrap(), completion);

        drop(receiver);
        assert!(!reply.deliver(completion));
    }
}
