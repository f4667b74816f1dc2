//! # Checkout Error Types
//!
//! Every failure the checkout engine can report, classified by what the
//! caller can do about it.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Error Taxonomy                              │
//! │                                                                         │
//! │  USER-CORRECTABLE (400)                                                │
//! │  ├── InvalidCart         - empty / malformed cart, bad price or qty    │
//! │  ├── InvalidRequest      - malformed session id or pinned QR amount    │
//! │  ├── StaleQrAmount       - QR requested for a different amount         │
//! │  └── StaleQrCart         - QR requested for a different cart           │
//! │                                                                         │
//! │  SESSION INTEGRITY (500)                                               │
//! │  ├── SessionNotFound     - processor does not know the session         │
//! │  └── CorruptMetadata     - snapshot missing or malformed               │
//! │                                                                         │
//! │  TERMINAL NON-PAID (409)                                               │
//! │  └── SettlementRejected  - session expired / no payment required       │
//! │                                                                         │
//! │  RETRYABLE (503)                                                       │
//! │  └── Transient           - timeout, connect error, 5xx, 429, pool      │
//! │                                                                         │
//! │  OPAQUE FAILURES (500)                                                 │
//! │  ├── Processor           - definitive processor rejection              │
//! │  ├── Storage             - database failure before money moved         │
//! │  ├── PartialSettlement   - money captured, order NOT written           │
//! │  ├── InvalidReceiver     - misconfigured PromptPay id                  │
//! │  └── QrRender            - SVG rendering failed                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;

/// Why a session will never settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The session expired before the shopper paid.
    Expired,
    /// The processor reports that no payment was required.
    NoPaymentRequired,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Expired => f.write_str("session expired"),
            RejectReason::NoPaymentRequired => f.write_str("no payment required"),
        }
    }
}

/// Checkout engine errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart is empty, malformed, or has an invalid line.
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// A non-cart input (session id, pinned QR amount) is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The processor has no session with this id.
    #[error("Payment session not found: {0}")]
    SessionNotFound(String),

    /// The session's metadata snapshot cannot be used to build an order.
    #[error("Corrupt session metadata for {session_id}: {reason}")]
    CorruptMetadata { session_id: String, reason: String },

    /// The session reached a terminal state without payment.
    #[error("Settlement rejected for {session_id}: {reason}")]
    SettlementRejected {
        session_id: String,
        reason: RejectReason,
    },

    /// A dependency is temporarily unavailable. Retrying may succeed.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    /// The processor definitively rejected the request.
    #[error("Payment processor error: {0}")]
    Processor(String),

    /// The database failed before any money was captured.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payment is confirmed but the order could not be written.
    ///
    /// Needs operator attention. Calling the reconciler again for the same
    /// session is safe.
    #[error("Payment captured for {session_id} but order was not recorded: {reason}")]
    PartialSettlement { session_id: String, reason: String },

    /// The QR code on screen no longer matches the requested amount.
    #[error("QR amount changed from {pinned} to {requested}; request a new code")]
    StaleQrAmount { pinned: Decimal, requested: Decimal },

    /// The QR code on screen was issued for different cart lines.
    #[error("QR cart changed from {pinned} to {current}; request a new code")]
    StaleQrCart { pinned: String, current: String },

    /// The configured PromptPay receiver is not a valid identifier.
    #[error("Invalid PromptPay receiver: {0}")]
    InvalidReceiver(String),

    /// The QR code could not be rendered.
    #[error("QR rendering failed: {0}")]
    QrRender(String),
}

impl CheckoutError {
    /// Returns true if this error is recoverable and the call can be retried.
    ///
    /// ## Retryable Errors
    /// - Processor timeouts and connection failures
    /// - Processor 5xx / 429
    /// - Database pool exhaustion
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Transient(_))
    }

    /// Returns true if the caller sent something it can fix.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::InvalidCart(_)
                | CheckoutError::InvalidRequest(_)
                | CheckoutError::StaleQrAmount { .. }
                | CheckoutError::StaleQrCart { .. }
        )
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::InvalidCart(err.to_string())
    }
}

/// Core errors raised while pricing a cart.
///
/// The reconciler maps snapshot errors itself because it knows the session.
impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::AmountOutOfRange(msg) => {
                CheckoutError::InvalidCart(format!("amount out of range: {}", msg))
            }
            CoreError::CorruptSnapshot(reason) => CheckoutError::CorruptMetadata {
                session_id: "unknown".to_string(),
                reason,
            },
            CoreError::InvalidReceiver(msg) => CheckoutError::InvalidReceiver(msg),
        }
    }
}

impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            CheckoutError::Transient(err.to_string())
        } else {
            CheckoutError::Storage(err.to_string())
        }
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CheckoutError::Transient("timeout".into()).is_retryable());

        assert!(!CheckoutError::Processor("card_declined".into()).is_retryable());
        assert!(!CheckoutError::SessionNotFound("cs_1".into()).is_retryable());
        assert!(!CheckoutError::PartialSettlement {
            session_id: "cs_1".into(),
            reason: "disk full".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_db_errors_split_by_transience() {
        assert!(matches!(
            CheckoutError::from(DbError::PoolExhausted),
            CheckoutError::Transient(_)
        ));
        assert!(matches!(
            CheckoutError::from(DbError::QueryFailed("x".into())),
            CheckoutError::Storage(_)
        ));
    }

    #[test]
    fn test_validation_is_invalid_cart() {
        let err: CheckoutError = ValidationError::EmptyCart.into();
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "Invalid cart: Invalid or empty products array");
    }

    #[test]
    fn test_reject_reason_display() {
        let err = CheckoutError::SettlementRejected {
            session_id: "cs_1".into(),
            reason: RejectReason::Expired,
        };
        assert_eq!(err.to_string(), "Settlement rejected for cs_1: session expired");
    }
}
