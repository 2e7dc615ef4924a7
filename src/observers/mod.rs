//! Observer channel for screen state changes.
//!
//! Renderers subscribe explicitly and receive typed [`ScreenEvent`]s over a
//! bounded channel:
//! - Inventory reloads
//! - Selection and tier-change availability changes
//! - Purchase, change and consume outcomes
//!
//! Observers that fall behind are dropped rather than blocking the screen.
//!
//! # Example
//!
//! ```ignore
//! let handle = screen.subscribe(ObserverConfig {
//!     filter: EventFilter::selection(),
//!     ..Default::default()
//! });
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         ScreenEvent::SelectionChanged { selected, change_enabled } => {
//!             render(selected, change_enabled)
//!         }
//!         ScreenEvent::Detached { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::ObserverManager;
pub use types::{
    DetachReason, EventFilter, ObserverConfig, ObserverHandle, ObserverId, ScreenEvent,
};
