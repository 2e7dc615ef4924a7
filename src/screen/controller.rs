//! Tier-change screen controller.

use super::config::ScreenConfig;
use crate::billing::{
    BillingClient, Completion, CompletionSender, FailureKind, InventoryRequest, Operation, Outcome,
    Recovery, ResponseCode, Ticket,
};
use crate::error::{BillingError, Result};
use crate::observers::{
    DetachReason, EventFilter, ObserverConfig, ObserverHandle, ObserverId, ObserverManager,
    ScreenEvent,
};
use crate::persistence::SavedState;
use crate::reconciler::Reconciler;
use crate::types::{PurchaseToken, SkuId, Snapshot};
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One screen instance: owns a reconciler and applies billing completions to it.
///
/// All methods run on the screen's control thread. Completions produced by the
/// billing client are buffered on a channel until [`pump`](Self::pump) is
/// called. At most one inventory reload is outstanding at a time; further
/// reload requests are coalesced into a single follow-up reload.
pub struct TierScreen<C: BillingClient> {
    config: ScreenConfig,
    client: Arc<C>,
    reconciler: Reconciler,
    observers: ObserverManager,
    reply: CompletionSender,
    completions: Receiver<Completion>,
    next_ticket: Ticket,
    reload_in_flight: Option<Ticket>,
    reload_queued: bool,
    /// Last availability value sent to observers.
    change_enabled: bool,
}

impl<C: BillingClient> TierScreen<C> {
    /// Create a screen. Nothing is requested until [`start`](Self::start).
    pub fn new(config: ScreenConfig, client: Arc<C>) -> Result<Self> {
        config.validate()?;

        let (sender, completions) = unbounded();
        let reconciler = Reconciler::new(config.family);

        Ok(Self {
            config,
            client,
            reconciler,
            observers: ObserverManager::new(),
            reply: CompletionSender::new(sender),
            completions,
            next_ticket: Ticket(1),
            reload_in_flight: None,
            reload_queued: false,
            change_enabled: false,
        })
    }

    /// Issue the initial inventory reload.
    pub fn start(&mut self) {
        info!(family = %self.config.family, skus = self.config.skus.len(), "Starting screen");
        self.request_reload();
    }

    // --- Observers ---

    /// Subscribe to screen events with the configured buffer size.
    pub fn subscribe(&self, filter: EventFilter) -> ObserverHandle {
        self.observers.subscribe(ObserverConfig {
            buffer_size: self.config.observer_buffer_size,
            filter,
        })
    }

    /// Subscribe with an explicit observer configuration.
    pub fn subscribe_with(&self, config: ObserverConfig) -> ObserverHandle {
        self.observers.subscribe(config)
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.unsubscribe(id);
    }

    // --- Completions ---

    /// Apply every completion delivered so far. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.handle(completion);
            applied += 1;
        }
        applied
    }

    /// Apply a single completion.
    pub fn handle(&mut self, completion: Completion) {
        let Completion { ticket, outcome } = completion;

        match outcome {
            Outcome::Inventory(result) => self.on_inventory(ticket, result),
            outcome => self.on_operation(ticket, outcome),
        }
    }

    fn on_inventory(
        &mut self,
        ticket: Ticket,
        result: std::result::Result<Snapshot, ResponseCode>,
    ) {
        if self.reload_in_flight == Some(ticket) {
            self.reload_in_flight = None;
        } else {
            debug!(
                ?ticket,
                in_flight = ?self.reload_in_flight,
                "Inventory completion for a reload that is not in flight"
            );
        }

        match result {
            Ok(snapshot) => self.apply_snapshot(&snapshot),
            Err(code) => {
                // An `Ok` code in the error position is a broken client
                let kind = code.failure_kind().unwrap_or(FailureKind::ServiceFailure);
                self.on_reload_failed(ticket, code, kind);
            }
        }

        if self.reload_queued {
            self.reload_queued = false;
            self.request_reload();
        }
    }

    /// A failed reload keeps the previous views. It is not retried here; the
    /// next operation or explicit reload asks again.
    fn on_reload_failed(&mut self, ticket: Ticket, code: ResponseCode, kind: FailureKind) {
        match kind.recovery() {
            Recovery::TreatAsSuccess => {
                // No snapshot came back, so there is nothing to report as loaded
                info!(?ticket, response = %code, "Reload raced an ownership change");
            }
            Recovery::ShowUnsupported => {
                warn!(?ticket, response = %code, "Product family unsupported on reload");
                self.notify_unsupported();
            }
            Recovery::SilentReload => {
                debug!(?ticket, response = %code, "Reload did not complete");
            }
            Recovery::ReportAndReload => {
                warn!(?ticket, response = %code, ?kind, "Inventory reload failed");
                self.observers.broadcast(ScreenEvent::OperationFailed {
                    operation: Operation::Reload,
                    kind,
                });
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let changed = self.reconciler.reconcile(snapshot);

        let fingerprint = self
            .reconciler
            .last_fingerprint()
            .map(|f| f.to_hex())
            .unwrap_or_default();
        self.observers.broadcast(ScreenEvent::InventoryLoaded {
            fingerprint,
            owned: self.reconciler.owned().codes(),
            targets: self.reconciler.targets().codes(),
            supported: self.reconciler.is_supported(),
        });

        if !self.reconciler.is_supported() {
            self.notify_unsupported();
        }

        if changed {
            self.notify_selection();
        } else {
            self.refresh_availability();
        }
    }

    fn on_operation(&mut self, ticket: Ticket, outcome: Outcome) {
        let operation = outcome.operation();
        let response = outcome.response();
        let sku = match &outcome {
            Outcome::Purchase { sku, .. } => Some(sku.code.clone()),
            Outcome::ChangeSubscription { to, .. } => Some(to.code.clone()),
            _ => None,
        };

        match response.failure_kind() {
            None => {
                info!(?ticket, ?operation, ?sku, "Operation completed");
                self.observers
                    .broadcast(ScreenEvent::OperationCompleted { operation, sku });
            }
            Some(kind) => match kind.recovery() {
                Recovery::TreatAsSuccess => {
                    info!(
                        ?ticket,
                        ?operation,
                        response = %response,
                        "Ownership diverged from store, reloading"
                    );
                    self.observers
                        .broadcast(ScreenEvent::OperationCompleted { operation, sku });
                }
                Recovery::ShowUnsupported => {
                    warn!(?ticket, ?operation, response = %response, "Product family unsupported");
                    self.notify_unsupported();
                }
                Recovery::SilentReload => {
                    debug!(?ticket, ?operation, response = %response, "Operation did not complete");
                }
                Recovery::ReportAndReload => {
                    warn!(?ticket, ?operation, response = %response, ?kind, "Operation failed");
                    self.observers
                        .broadcast(ScreenEvent::OperationFailed { operation, kind });
                }
            },
        }

        self.request_reload();
    }

    // --- Requests ---

    /// Reload inventory now, or once the reload in flight completes.
    ///
    /// Returns true if a request was issued immediately.
    pub fn request_reload(&mut self) -> bool {
        if let Some(in_flight) = self.reload_in_flight {
            debug!(?in_flight, "Reload already in flight, queueing another");
            self.reload_queued = true;
            return false;
        }

        let ticket = self.allocate_ticket();
        let request = InventoryRequest::new(self.config.family, self.config.skus.iter().cloned());
        self.reload_in_flight = Some(ticket);
        self.client.request_reload(ticket, request, self.reply.clone());
        true
    }

    /// Start a purchase flow.
    pub fn purchase(&mut self, sku: SkuId) -> Ticket {
        let ticket = self.allocate_ticket();
        debug!(?ticket, sku = %sku, "Requesting purchase");
        self.client.request_purchase(ticket, sku, self.reply.clone());
        ticket
    }

    /// Switch the selected subscriptions to the tier `to_code`.
    ///
    /// Fails if the change action is disabled or `to_code` is not a target tier.
    pub fn change_tier(&mut self, to_code: &str) -> Result<Ticket> {
        if !self.reconciler.change_enabled() {
            return Err(BillingError::ChangeUnavailable(
                "no owned subscription selected or no tier to switch to".into(),
            ));
        }
        let request = self
            .reconciler
            .change_request(to_code)
            .ok_or_else(|| BillingError::UnknownSku(to_code.to_string()))?;

        let ticket = self.allocate_ticket();
        info!(?ticket, from = ?request.from, to = %request.to.id, "Requesting tier change");
        self.client
            .request_change_subscription(ticket, request.from, request.to.id, self.reply.clone());
        Ok(ticket)
    }

    /// Consume a one-time purchase.
    pub fn consume(&mut self, token: PurchaseToken) -> Ticket {
        let ticket = self.allocate_ticket();
        debug!(?ticket, token = %token, "Requesting consume");
        self.client.request_consume(ticket, token, self.reply.clone());
        ticket
    }

    fn allocate_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        ticket
    }

    // --- Selection ---

    /// Check or uncheck an owned subscription by code.
    ///
    /// Returns true if the selection changed; observers are notified only then.
    pub fn toggle(&mut self, code: &str, checked: bool) -> bool {
        let id = SkuId::new(self.config.family, code);
        let changed = self.reconciler.toggle(&id, checked);
        if changed {
            self.notify_selection();
        }
        changed
    }

    fn notify_selection(&mut self) {
        self.observers.broadcast(ScreenEvent::SelectionChanged {
            selected: self.reconciler.selection().codes(),
            change_enabled: self.reconciler.change_enabled(),
        });
        self.refresh_availability();
    }

    fn refresh_availability(&mut self) {
        let enabled = self.reconciler.change_enabled();
        if enabled != self.change_enabled {
            self.change_enabled = enabled;
            self.observers
                .broadcast(ScreenEvent::AvailabilityChanged { enabled });
        }
    }

    fn notify_unsupported(&self) {
        self.observers.broadcast(ScreenEvent::Unsupported {
            family: self.config.family.to_string(),
        });
    }

    // --- Lifecycle ---

    /// Capture the selection for a later [`resume`](Self::resume).
    ///
    /// An empty selection leaves the slot out entirely.
    pub fn suspend(&self) -> SavedState {
        let mut state = SavedState::new();
        if let Some(codes) = self.reconciler.snapshot_for_persistence() {
            state.put(self.config.selection_slot.clone(), codes);
        }
        state
    }

    /// Feed a saved selection back in. Works before or after the first reload.
    ///
    /// Returns true if the selection changed immediately.
    pub fn resume(&mut self, state: &SavedState) -> bool {
        let Some(codes) = state.get(&self.config.selection_slot) else {
            return false;
        };

        debug!(slot = %self.config.selection_slot, codes = codes.len(), "Restoring selection");
        let changed = self.reconciler.restore(codes.iter().cloned());
        if changed {
            self.notify_selection();
        }
        changed
    }

    /// Tear the screen down. Observers are detached and completions still in
    /// flight are discarded when they arrive.
    pub fn close(self) {
        info!(family = %self.config.family, "Closing screen");
        self.observers.detach_all(DetachReason::ScreenClosed);
    }

    // --- Accessors ---

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn is_reload_in_flight(&self) -> bool {
        self.reload_in_flight.is_some()
    }

    pub fn is_reload_queued(&self) -> bool {
        self.reload_queued
    }

    pub fn change_enabled(&self) -> bool {
        self.reconciler.change_enabled()
    }
}
