//! Observer types for screen state notifications.

use crate::billing::{FailureKind, Operation};
use serde::{Deserialize, Serialize};

/// Configuration for an observer.
#[derive(Clone, Debug)]
pub struct ObserverConfig {
    /// Max buffered events before the observer is dropped.
    /// Default: 256
    pub buffer_size: usize,

    /// Which events to deliver.
    pub filter: EventFilter,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            filter: EventFilter::all(),
        }
    }
}

/// Filter criteria for observers.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Inventory reload results.
    pub include_inventory: bool,

    /// Selection and availability changes.
    pub include_selection: bool,

    /// Purchase, change and consume outcomes.
    pub include_operations: bool,
}

impl EventFilter {
    /// Only selection and availability changes.
    pub fn selection() -> Self {
        Self {
            include_selection: true,
            ..Default::default()
        }
    }

    /// Only inventory reloads.
    pub fn inventory() -> Self {
        Self {
            include_inventory: true,
            ..Default::default()
        }
    }

    /// Only operation outcomes.
    pub fn operations() -> Self {
        Self {
            include_operations: true,
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_inventory: true,
            include_selection: true,
            include_operations: true,
        }
    }

    pub(crate) fn accepts(&self, event: &ScreenEvent) -> bool {
        match event {
            ScreenEvent::InventoryLoaded { .. } | ScreenEvent::Unsupported { .. } => {
                self.include_inventory
            }
            ScreenEvent::SelectionChanged { .. } | ScreenEvent::AvailabilityChanged { .. } => {
                self.include_selection
            }
            ScreenEvent::OperationCompleted { .. } | ScreenEvent::OperationFailed { .. } => {
                self.include_operations
            }
            ScreenEvent::Detached { .. } => true,
        }
    }
}

/// Events emitted to screen observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenEvent {
    // --- Inventory ---
    /// A snapshot was reconciled.
    InventoryLoaded {
        /// Hex fingerprint of the snapshot.
        fingerprint: String,
        owned: Vec<String>,
        targets: Vec<String>,
        supported: bool,
    },

    /// The screen's product family is not supported by the store.
    Unsupported {
        family: String,
    },

    // --- Selection ---
    /// The selection gained or lost an entry.
    SelectionChanged {
        selected: Vec<String>,
        change_enabled: bool,
    },

    /// The tier-change action flipped between enabled and disabled.
    AvailabilityChanged {
        enabled: bool,
    },

    // --- Operations ---
    /// A purchase, change or consume finished, or failed in a way that is
    /// treated as success.
    OperationCompleted {
        operation: Operation,
        sku: Option<String>,
    },

    /// A purchase, change or consume failed.
    OperationFailed {
        operation: Operation,
        kind: FailureKind,
    },

    // --- Lifecycle ---
    /// Observer was detached from the screen.
    Detached {
        reason: DetachReason,
    },
}

/// Why an observer was detached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// The screen was closed.
    ScreenClosed,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Handle to receive screen events.
pub struct ObserverHandle {
    pub id: ObserverId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ScreenEvent>,
}

impl ObserverHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ScreenEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ScreenEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ScreenEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every event buffered so far.
    pub fn drain(&self) -> Vec<ScreenEvent> {
        self.receiver.try_iter().collect()
    }
}
