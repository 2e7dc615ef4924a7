//! Store response codes and how each failure is recovered from.

use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response code reported by the billing service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCode {
    ServiceTimeout,
    FeatureNotSupported,
    ServiceDisconnected,
    Ok,
    UserCanceled,
    ServiceUnavailable,
    BillingUnavailable,
    ItemUnavailable,
    DeveloperError,
    Error,
    ItemAlreadyOwned,
    ItemNotOwned,
    NetworkError,
}

impl ResponseCode {
    /// Numeric code used by the store.
    pub fn raw(self) -> i32 {
        match self {
            ResponseCode::ServiceTimeout => -3,
            ResponseCode::FeatureNotSupported => -2,
            ResponseCode::ServiceDisconnected => -1,
            ResponseCode::Ok => 0,
            ResponseCode::UserCanceled => 1,
            ResponseCode::ServiceUnavailable => 2,
            ResponseCode::BillingUnavailable => 3,
            ResponseCode::ItemUnavailable => 4,
            ResponseCode::DeveloperError => 5,
            ResponseCode::Error => 6,
            ResponseCode::ItemAlreadyOwned => 7,
            ResponseCode::ItemNotOwned => 8,
            ResponseCode::NetworkError => 12,
        }
    }

    /// Decode a numeric code. Codes outside the known set are rejected.
    pub fn from_raw(raw: i32) -> Result<Self> {
        let code = match raw {
            -3 => ResponseCode::ServiceTimeout,
            -2 => ResponseCode::FeatureNotSupported,
            -1 => ResponseCode::ServiceDisconnected,
            0 => ResponseCode::Ok,
            1 => ResponseCode::UserCanceled,
            2 => ResponseCode::ServiceUnavailable,
            3 => ResponseCode::BillingUnavailable,
            4 => ResponseCode::ItemUnavailable,
            5 => ResponseCode::DeveloperError,
            6 => ResponseCode::Error,
            7 => ResponseCode::ItemAlreadyOwned,
            8 => ResponseCode::ItemNotOwned,
            12 => ResponseCode::NetworkError,
            other => return Err(BillingError::UnknownResponseCode(other)),
        };
        Ok(code)
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }

    /// Failure kind for a non-OK code, `None` for [`ResponseCode::Ok`].
    pub fn failure_kind(self) -> Option<FailureKind> {
        let kind = match self {
            ResponseCode::Ok => return None,
            ResponseCode::UserCanceled => FailureKind::UserCanceled,
            ResponseCode::ItemAlreadyOwned | ResponseCode::ItemNotOwned => {
                FailureKind::OwnershipRace
            }
            ResponseCode::FeatureNotSupported | ResponseCode::BillingUnavailable => {
                FailureKind::Unsupported
            }
            ResponseCode::ItemUnavailable => FailureKind::CatalogMismatch,
            ResponseCode::DeveloperError => FailureKind::DeveloperError,
            ResponseCode::ServiceTimeout
            | ResponseCode::ServiceDisconnected
            | ResponseCode::ServiceUnavailable
            | ResponseCode::Error
            | ResponseCode::NetworkError => FailureKind::ServiceFailure,
        };
        Some(kind)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.raw())
    }
}

/// Closed classification of store failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The user backed out of the store flow.
    UserCanceled,
    /// Local and store ownership diverged (already owned / not owned).
    OwnershipRace,
    /// The product family or billing itself is unavailable on this device.
    Unsupported,
    /// The store does not know the requested item right now.
    CatalogMismatch,
    /// The service failed or could not be reached.
    ServiceFailure,
    /// The request was malformed.
    DeveloperError,
}

impl FailureKind {
    /// The single recovery policy for this kind.
    pub fn recovery(self) -> Recovery {
        match self {
            FailureKind::OwnershipRace => Recovery::TreatAsSuccess,
            FailureKind::Unsupported => Recovery::ShowUnsupported,
            FailureKind::UserCanceled | FailureKind::CatalogMismatch => Recovery::SilentReload,
            FailureKind::ServiceFailure | FailureKind::DeveloperError => Recovery::ReportAndReload,
        }
    }
}

/// What the screen does with a failed operation. Every policy ends in a reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Report the operation as completed, then reload.
    TreatAsSuccess,
    /// Surface the disabled/empty state, then reload.
    ShowUnsupported,
    /// Reload without telling observers about the failure.
    SilentReload,
    /// Report the failure to observers, then reload.
    ReportAndReload,
}

/// Collaborator operations a screen can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Reload,
    Purchase,
    ChangeSubscription,
    Consume,
}
