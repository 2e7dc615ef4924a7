//! In-memory billing service.
//!
//! Requests are queued when issued and only answered when the owner calls
//! [`FakeBillingService::complete_next`] (or one of its siblings), so the
//! timing and ordering of completions is fully controlled by the caller.

use super::client::{BillingClient, Completion, CompletionSender, InventoryRequest, Outcome, Ticket};
use super::response::{Operation, ResponseCode};
use super::static_responses::{self, StaticResponse};
use crate::types::{
    ProductFamily, Purchase, PurchaseState, PurchaseToken, SkuDetails, SkuId, Snapshot, Timestamp,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// A request waiting to be answered.
enum Request {
    Reload(InventoryRequest),
    Purchase(SkuId),
    Change { from: Vec<SkuId>, to: SkuId },
    Consume(PurchaseToken),
}

impl Request {
    fn operation(&self) -> Operation {
        match self {
            Request::Reload(_) => Operation::Reload,
            Request::Purchase(_) => Operation::Purchase,
            Request::Change { .. } => Operation::ChangeSubscription,
            Request::Consume(_) => Operation::Consume,
        }
    }
}

struct QueuedRequest {
    ticket: Ticket,
    request: Request,
    reply: CompletionSender,
}

/// Store-side state.
struct Inventory {
    supported: BTreeMap<ProductFamily, bool>,
    catalog: Vec<SkuDetails>,
    purchases: Vec<Purchase>,
    /// One-shot injected failures per operation.
    failures: HashMap<Operation, VecDeque<ResponseCode>>,
    next_order: u64,
}

impl Inventory {
    fn is_supported(&self, family: ProductFamily) -> bool {
        self.supported.get(&family).copied().unwrap_or(false)
    }

    fn in_catalog(&self, id: &SkuId) -> bool {
        self.catalog.iter().any(|details| &details.id == id)
    }

    fn owns(&self, id: &SkuId) -> bool {
        self.purchases
            .iter()
            .any(|purchase| &purchase.id == id && purchase.is_purchased())
    }

    fn record(&mut self, id: SkuId, state: PurchaseState) -> Purchase {
        self.next_order += 1;
        let purchase = Purchase {
            auto_renewing: id.family == ProductFamily::Subscription,
            token: PurchaseToken(format!("token-{}-{}", id.code, self.next_order)),
            order_id: format!("GPA.0000-{:04}", self.next_order),
            purchase_time: Timestamp::now(),
            state,
            id,
        };
        self.purchases.push(purchase.clone());
        purchase
    }

    fn take_failure(&mut self, operation: Operation) -> Option<ResponseCode> {
        self.failures.get_mut(&operation).and_then(VecDeque::pop_front)
    }

    fn snapshot(&self, request: &InventoryRequest) -> Snapshot {
        let wanted = |details: &&SkuDetails| {
            details.id.family == request.family
                && (request.skus.is_empty() || request.skus.contains(&details.id.code))
        };

        Snapshot {
            supported: BTreeMap::from([(request.family, self.is_supported(request.family))]),
            skus: self.catalog.iter().filter(wanted).cloned().collect(),
            purchases: self
                .purchases
                .iter()
                .filter(|purchase| purchase.id.family == request.family)
                .cloned()
                .collect(),
        }
    }

    fn purchase(&mut self, sku: &SkuId) -> Result<Purchase, ResponseCode> {
        if !self.is_supported(sku.family) {
            return Err(ResponseCode::FeatureNotSupported);
        }

        match static_responses::lookup(&sku.code) {
            Some(StaticResponse::Completes(state)) => return Ok(self.record(sku.clone(), state)),
            Some(StaticResponse::Fails(code)) => return Err(code),
            None => {}
        }

        if !self.in_catalog(sku) {
            return Err(ResponseCode::ItemUnavailable);
        }
        if self.owns(sku) {
            return Err(ResponseCode::ItemAlreadyOwned);
        }
        Ok(self.record(sku.clone(), PurchaseState::Purchased))
    }

    fn change(&mut self, from: &[SkuId], to: &SkuId) -> Result<Purchase, ResponseCode> {
        if !self.is_supported(to.family) {
            return Err(ResponseCode::FeatureNotSupported);
        }
        if from.is_empty() {
            return Err(ResponseCode::DeveloperError);
        }
        if from.iter().any(|id| !self.owns(id)) {
            return Err(ResponseCode::ItemNotOwned);
        }
        if !self.in_catalog(to) {
            return Err(ResponseCode::ItemUnavailable);
        }
        if self.owns(to) {
            return Err(ResponseCode::ItemAlreadyOwned);
        }

        self.purchases.retain(|purchase| !from.contains(&purchase.id));
        Ok(self.record(to.clone(), PurchaseState::Purchased))
    }

    fn consume(&mut self, token: &PurchaseToken) -> Result<(), ResponseCode> {
        let position = self
            .purchases
            .iter()
            .position(|purchase| &purchase.token == token && purchase.is_purchased())
            .ok_or(ResponseCode::ItemNotOwned)?;
        self.purchases.remove(position);
        Ok(())
    }
}

/// Deterministic billing service for tests and demos.
pub struct FakeBillingService {
    inventory: Mutex<Inventory>,
    queue: Mutex<VecDeque<QueuedRequest>>,
}

impl FakeBillingService {
    /// Empty store with both product families supported.
    pub fn new() -> Self {
        Self {
            inventory: Mutex::new(Inventory {
                supported: BTreeMap::from([
                    (ProductFamily::InApp, true),
                    (ProductFamily::Subscription, true),
                ]),
                catalog: Vec::new(),
                purchases: Vec::new(),
                failures: HashMap::new(),
                next_order: 0,
            }),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Add catalog entries.
    pub fn with_catalog<I>(self, skus: I) -> Self
    where
        I: IntoIterator<Item = SkuDetails>,
    {
        self.inventory.lock().catalog.extend(skus);
        self
    }

    /// Add the reserved static-response ids to the catalog.
    pub fn with_static_responses(self) -> Self {
        self.with_catalog(static_responses::catalog())
    }

    pub fn set_supported(&self, family: ProductFamily, supported: bool) {
        self.inventory.lock().supported.insert(family, supported);
    }

    /// Record a purchase of `sku` directly, bypassing the purchase flow.
    pub fn grant(&self, sku: SkuId) -> PurchaseToken {
        self.inventory.lock().record(sku, PurchaseState::Purchased).token
    }

    /// Insert a raw purchase record. The SKU need not be in the catalog.
    pub fn insert_purchase(&self, purchase: Purchase) {
        self.inventory.lock().purchases.push(purchase);
    }

    /// Remove every purchase record of `sku`. Returns true if any existed.
    pub fn revoke(&self, sku: &SkuId) -> bool {
        let mut inventory = self.inventory.lock();
        let before = inventory.purchases.len();
        inventory.purchases.retain(|purchase| &purchase.id != sku);
        inventory.purchases.len() != before
    }

    /// Current purchase records.
    pub fn purchases(&self) -> Vec<Purchase> {
        self.inventory.lock().purchases.clone()
    }

    /// Make the next request of `operation` fail with `code`.
    pub fn fail_next(&self, operation: Operation, code: ResponseCode) {
        self.inventory
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(code);
    }

    /// Number of requests waiting to be answered.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Answer the oldest queued request. Returns false if nothing was queued.
    pub fn complete_next(&self) -> bool {
        let next = self.queue.lock().pop_front();
        match next {
            Some(queued) => {
                self.answer(queued);
                true
            }
            None => false,
        }
    }

    /// Answer the newest queued request first.
    pub fn complete_latest(&self) -> bool {
        let latest = self.queue.lock().pop_back();
        match latest {
            Some(queued) => {
                self.answer(queued);
                true
            }
            None => false,
        }
    }

    /// Answer every queued request in order, including requests issued while
    /// answering. Returns how many were answered.
    pub fn complete_all(&self) -> usize {
        let mut answered = 0;
        while self.complete_next() {
            answered += 1;
        }
        answered
    }

    fn answer(&self, queued: QueuedRequest) {
        let QueuedRequest {
            ticket,
            request,
            reply,
        } = queued;

        let outcome = {
            let mut inventory = self.inventory.lock();
            let injected = inventory.take_failure(request.operation());

            match request {
                Request::Reload(request) => Outcome::Inventory(match injected {
                    Some(code) => Err(code),
                    None => Ok(inventory.snapshot(&request)),
                }),
                Request::Purchase(sku) => {
                    let result = match injected {
                        Some(code) => Err(code),
                        None => inventory.purchase(&sku),
                    };
                    Outcome::Purchase { sku, result }
                }
                Request::Change { from, to } => {
                    let result = match injected {
                        Some(code) => Err(code),
                        None => inventory.change(&from, &to),
                    };
                    Outcome::ChangeSubscription { from, to, result }
                }
                Request::Consume(token) => {
                    let result = match injected {
                        Some(code) => Err(code),
                        None => inventory.consume(&token),
                    };
                    Outcome::Consume { token, result }
                }
            }
        };

        debug!(?ticket, response = %outcome.response(), "Answering billing request");
        reply.deliver(Completion { ticket, outcome });
    }

    fn enqueue(&self, ticket: Ticket, request: Request, reply: CompletionSender) {
        self.queue.lock().push_back(QueuedRequest {
            ticket,
            request,
            reply,
        });
    }
}

impl Default for FakeBillingService {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingClient for FakeBillingService {
    fn request_reload(&self, ticket: Ticket, request: InventoryRequest, reply: CompletionSender) {
        self.enqueue(ticket, Request::Reload(request), reply);
    }

    fn request_purchase(&self, ticket: Ticket, sku: SkuId, reply: CompletionSender) {
        self.enqueue(ticket, Request::Purchase(sku), reply);
    }

    fn request_change_subscription(
        &self,
        ticket: Ticket,
        from: Vec<SkuId>,
        to: SkuId,
        reply: CompletionSender,
    ) {
        self.enqueue(ticket, Request::Change { from, to }, reply);
    }

    fn request_consume(&self, ticket: Ticket, token: PurchaseToken, reply: CompletionSender) {
        self.enqueue(ticket, Request::Consume(token), reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};

    fn tiers() -> Vec<SkuDetails> {
        ["sub_01", "sub_02", "sub_03"]
            .into_iter()
            .map(|code| SkuDetails::new(SkuId::subscription(code), code))
            .collect()
    }

    fn channel() -> (CompletionSender, Receiver<Completion>) {
        let (sender, receiver) = unbounded();
        (CompletionSender::new(sender), receiver)
    }

    #[test]
    fn test_requests_wait_for_completion() {
        let service = FakeBillingService::new().with_catalog(tiers());
        let (reply, receiver) = channel();

        service.request_reload(
            Ticket(1),
            InventoryRequest::new(ProductFamily::Subscription, Vec::<String>::new()),
            reply,
        );
        assert_eq!(service.pending_count(), 1);
        assert!(receiver.try_recv().is_err());

        assert_eq!(service.complete_all(), 1);
        let completion = receiver.try_recv().unwrap();
        assert_eq!(completion.ticket, Ticket(1));
        match completion.outcome {
            Outcome::Inventory(Ok(snapshot)) => {
                assert_eq!(snapshot.skus.len(), 3);
                assert!(snapshot.is_supported(ProductFamily::Subscription));
            }
            other => panic!("Expected inventory, got {:?}", other),
        }
    }

    #[test]
    fn test_reload_filters_requested_skus() {
        let service = FakeBillingService::new().with_catalog(tiers());
        let (reply, receiver) = channel();

        service.request_reload(
            Ticket(1),
            InventoryRequest::new(ProductFamily::Subscription, ["sub_02"]),
            reply,
        );
        service.complete_next();

        let Outcome::Inventory(Ok(snapshot)) = receiver.try_recv().unwrap().outcome else {
            panic!("Expected inventory");
        };
        assert_eq!(snapshot.skus.len(), 1);
        assert_eq!(snapshot.skus[0].id.code, "sub_02");
    }

    #[test]
    fn test_purchase_then_already_owned() {
        let service = FakeBillingService::new().with_catalog(tiers());
        let (reply, receiver) = channel();

        service.request_purchase(Ticket(1), SkuId::subscription("sub_01"), reply.clone());
        service.request_purchase(Ticket(2), SkuId::subscription("sub_01"), reply);
        service.complete_all();

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.outcome.response(), ResponseCode::Ok);
        let second = receiver.try_recv().unwrap();
        assert_eq!(second.outcome.response(), ResponseCode::ItemAlreadyOwned);
    }

    #[test]
    fn test_change_replaces_from_set() {
        let service = FakeBillingService::new().with_catalog(tiers());
        service.grant(SkuId::subscription("sub_01"));
        let (reply, receiver) = channel();

        service.request_change_subscription(
            Ticket(1),
            vec![SkuId::subscription("sub_01")],
            SkuId::subscription("sub_03"),
            reply,
        );
        service.complete_next();

        assert_eq!(receiver.try_recv().unwrap().outcome.response(), ResponseCode::Ok);
        let owned: Vec<_> = service.purchases().into_iter().map(|p| p.id.code).collect();
        assert_eq!(owned, vec!["sub_03"]);
    }

    #[test]
    fn test_change_from_unowned_fails() {
        let service = FakeBillingService::new().with_catalog(tiers());
        let (reply, receiver) = channel();

        service.request_change_subscription(
            Ticket(1),
            vec![SkuId::subscription("sub_01")],
            SkuId::subscription("sub_02"),
            reply,
        );
        service.complete_next();

        assert_eq!(
            receiver.try_recv().unwrap().outcome.response(),
            ResponseCode::ItemNotOwned
        );
    }

    #[test]
    fn test_static_responses() {
        let service = FakeBillingService::new().with_static_responses();
        let (reply, receiver) = channel();

        for code in [
            static_responses::PURCHASED,
            static_responses::CANCELED,
            static_responses::REFUNDED,
            static_responses::ITEM_UNAVAILABLE,
        ] {
            service.request_purchase(Ticket(1), SkuId::in_app(code), reply.clone());
        }
        service.complete_all();

        let responses: Vec<_> = receiver.try_iter().map(|c| c.outcome.response()).collect();
        assert_eq!(
            responses,
            vec![
                ResponseCode::Ok,
                ResponseCode::UserCanceled,
                ResponseCode::Ok,
                ResponseCode::ItemUnavailable
            ]
        );

        let states: Vec<_> = service.purchases().into_iter().map(|p| p.state).collect();
        assert_eq!(states, vec![PurchaseState::Purchased, PurchaseState::Refunded]);
    }

    #[test]
    fn test_consume() {
        let service = FakeBillingService::new().with_static_responses();
        let token = service.grant(SkuId::in_app(static_responses::PURCHASED));
        let (reply, receiver) = channel();

        service.request_consume(Ticket(1), token.clone(), reply.clone());
        service.request_consume(Ticket(2), token, reply);
        service.complete_all();

        let responses: Vec<_> = receiver.try_iter().map(|c| c.outcome.response()).collect();
        assert_eq!(responses, vec![ResponseCode::Ok, ResponseCode::ItemNotOwned]);
        assert!(service.purchases().is_empty());
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let service = FakeBillingService::new().with_catalog(tiers());
        service.fail_next(Operation::Purchase, ResponseCode::NetworkError);
        let (reply, receiver) = channel();

        service.request_purchase(Ticket(1), SkuId::subscription("sub_01"), reply.clone());
        service.request_purchase(Ticket(2), SkuId::subscription("sub_01"), reply);
        service.complete_all();

        let responses: Vec<_> = receiver.try_iter().map(|c| c.outcome.response()).collect();
        assert_eq!(responses, vec![ResponseCode::NetworkError, ResponseCode::Ok]);
    }

    #[test]
    fn test_unsupported_family() {
        let service = FakeBillingService::new().with_catalog(tiers());
        service.set_supported(ProductFamily::Subscription, false);
        let (reply, receiver) = channel();

        service.request_purchase(Ticket(1), SkuId::subscription("sub_01"), reply);
        service.complete_next();

        assert_eq!(
            receiver.try_recv().unwrap().outcome.response(),
            ResponseCode::FeatureNotSupported
        );
    }

    #[test]
    fn test_complete_latest_answers_out_of_order() {
        let service = FakeBillingService::new().with_catalog(tiers());
        let (reply, receiver) = channel();

        service.request_purchase(Ticket(1), SkuId::subscription("sub_01"), reply.clone());
        service.request_purchase(Ticket(2), SkuId::subscription("sub_02"), reply);
        service.complete_latest();
        service.complete_latest();

        let tickets: Vec<_> = receiver.try_iter().map(|c| c.ticket).collect();
        assert_eq!(tickets, vec![Ticket(2), Ticket(1)]);
    }
}
