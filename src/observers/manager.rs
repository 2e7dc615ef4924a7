//! Observer manager for broadcasting screen events.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::types::{DetachReason, ObserverConfig, ObserverHandle, ObserverId, ScreenEvent};

/// Internal observer state.
struct Observer {
    config: ObserverConfig,
    sender: Sender<ScreenEvent>,
}

impl Observer {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone (observer will be dropped).
    fn try_send(&self, event: ScreenEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Manages observers of one screen and broadcasts events to them.
pub struct ObserverManager {
    /// Active observers by ID.
    observers: RwLock<HashMap<ObserverId, Observer>>,
    /// Counter for generating observer IDs.
    next_id: AtomicU64,
}

impl ObserverManager {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new observer.
    pub fn subscribe(&self, config: ObserverConfig) -> ObserverHandle {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.observers.write().insert(id, Observer { config, sender });

        ObserverHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: ObserverId) {
        if let Some(observer) = self.observers.write().remove(&id) {
            // Best effort
            let _ = observer.sender.try_send(ScreenEvent::Detached {
                reason: DetachReason::Unsubscribed,
            });
        }
    }

    /// Detach every observer, telling each why.
    pub fn detach_all(&self, reason: DetachReason) {
        let drained: Vec<Observer> = self.observers.write().drain().map(|(_, o)| o).collect();
        for observer in drained {
            let _ = observer.sender.try_send(ScreenEvent::Detached {
                reason: reason.clone(),
            });
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Send an event to every observer whose filter accepts it. Observers that
    /// fail to receive are dropped.
    pub fn broadcast(&self, event: ScreenEvent) {
        let mut to_remove = Vec::new();

        {
            let observers = self.observers.read();
            for (id, observer) in observers.iter() {
                if observer.config.filter.accepts(&event) && !observer.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut observers = self.observers.write();
            for id in to_remove {
                if let Some(observer) = observers.remove(&id) {
                    warn!(observer = id.0, "Dropping observer that stopped receiving events");
                    let _ = observer.sender.try_send(ScreenEvent::Detached {
                        reason: DetachReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for ObserverManager {
    fn default() -> Self {
        Self::new()
    }
}
