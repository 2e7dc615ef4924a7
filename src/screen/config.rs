//! Screen configuration.

use crate::error::{BillingError, Result};
use crate::types::ProductFamily;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default saved-state slot for the selection.
pub const DEFAULT_SELECTION_SLOT: &str = "selected_subscriptions";

/// Screen configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Product family the screen reconciles.
    pub family: ProductFamily,

    /// SKU codes requested on every reload.
    pub skus: Vec<String>,

    /// Saved-state slot holding the selection.
    /// Default: "selected_subscriptions"
    pub selection_slot: String,

    /// Buffer size for observers subscribed through the screen.
    /// Default: 256
    pub observer_buffer_size: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            family: ProductFamily::Subscription,
            skus: vec!["sub_01".into(), "sub_02".into(), "sub_03".into()],
            selection_slot: DEFAULT_SELECTION_SLOT.to_string(),
            observer_buffer_size: 256,
        }
    }
}

impl ScreenConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BillingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.skus.is_empty() {
            return Err(BillingError::InvalidConfig("skus must not be empty".into()));
        }
        if self.skus.iter().any(|code| code.is_empty()) {
            return Err(BillingError::InvalidConfig("sku codes must not be empty".into()));
        }
        if self.selection_slot.is_empty() {
            return Err(BillingError::InvalidConfig(
                "selection_slot must not be empty".into(),
            ));
        }
        if self.observer_buffer_size == 0 {
            return Err(BillingError::InvalidConfig(
                "observer_buffer_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
