//! Error types for the billing reconciler.

use thiserror::Error;

/// Main error type for reconciler, screen and persistence operations.
///
/// Store-side failures (canceled purchases, ownership races, ...) are not
/// errors here: they arrive as [`ResponseCode`](crate::billing::ResponseCode)
/// values inside completions and are handled by a recovery policy.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid saved state format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected:#010x}, got {got:#010x}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Saved state file is locked by another process")]
    Locked,

    #[error("Unknown billing response code: {0}")]
    UnknownResponseCode(i32),

    #[error("Unknown SKU: {0}")]
    UnknownSku(String),

    #[error("Tier change unavailable: {0}")]
    ChangeUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for BillingError {
    fn from(e: serde_json::Error) -> Self {
        BillingError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BillingError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BillingError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BillingError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BillingError::Deserialization(e.to_string())
    }
}

/// Result type for billing reconciler operations.
pub type Result<T> = std::result::Result<T, BillingError>;
