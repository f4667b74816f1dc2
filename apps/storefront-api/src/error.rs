//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront API                     │
//! │                                                                         │
//! │  Handler → Result<Json<T>, ApiError>                                    │
//! │                │                                                        │
//! │                ├── CheckoutError::InvalidCart ────────► 400 INVALID_CART│
//! │                ├── CheckoutError::SettlementRejected ─► 409             │
//! │                ├── CheckoutError::Transient ──────────► 503             │
//! │                ├── CheckoutError::PartialSettlement ──► 500             │
//! │                ├── DbError ───────────────────────────► 500 / 503       │
//! │                └── missing x-user-id ─────────────────► 401             │
//! │                                                                         │
//! │  Body: { "code": "INVALID_CART", "message": "...", "error": "..." }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `message` is safe to show a shopper. `error` carries the diagnostic text
//! the web client has always read on failures.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use storefront_checkout::CheckoutError;
use storefront_db::DbError;

/// API error returned from HTTP handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "SETTLEMENT_REJECTED",
///   "message": "Payment was not completed: session expired",
///   "error": "Settlement rejected for cs_123: session expired"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Diagnostic detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Cart empty or malformed (400)
    InvalidCart,

    /// Other input malformed (400)
    InvalidRequest,

    /// QR requested for a different amount than the one on screen (400)
    StaleQrAmount,

    /// QR requested for different cart lines than the code on screen (400)
    StaleQrCart,

    /// No authenticated user (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Session expired or required no payment (409)
    SettlementRejected,

    /// Processor does not know the session (500)
    SessionNotFound,

    /// Session metadata unusable (500)
    CorruptMetadata,

    /// Processor rejected the call (500)
    PaymentError,

    /// Payment captured but order not written (500)
    PartialSettlement,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,

    /// Dependency temporarily unavailable, retry later (503)
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidCart
            | ErrorCode::InvalidRequest
            | ErrorCode::StaleQrAmount
            | ErrorCode::StaleQrCart => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::SettlementRejected => StatusCode::CONFLICT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::SessionNotFound
            | ErrorCode::CorruptMetadata
            | ErrorCode::PaymentError
            | ErrorCode::PartialSettlement
            | ErrorCode::DatabaseError
            | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            error: None,
        }
    }

    /// Attaches diagnostic detail.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, message)
    }

    /// Creates an invalid cart error.
    pub fn invalid_cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidCart, message)
    }

    /// A malformed cart body. Wrong shapes are cart errors, not 422s.
    pub fn from_cart_rejection(rejection: JsonRejection) -> Self {
        ApiError::invalid_cart("Invalid or empty products array").with_error(rejection.body_text())
    }

    /// A malformed non-cart body.
    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        ApiError::invalid_request("Malformed request body").with_error(rejection.body_text())
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

/// Converts checkout errors to API errors.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let detail = err.to_string();
        match err {
            CheckoutError::InvalidCart(msg) => ApiError::invalid_cart(msg),
            CheckoutError::InvalidRequest(msg) => ApiError::invalid_request(msg),
            CheckoutError::StaleQrAmount { .. } => ApiError::new(ErrorCode::StaleQrAmount, detail),
            CheckoutError::StaleQrCart { .. } => ApiError::new(ErrorCode::StaleQrCart, detail),
            CheckoutError::SettlementRejected { reason, .. } => ApiError::new(
                ErrorCode::SettlementRejected,
                format!("Payment was not completed: {}", reason),
            )
            .with_error(detail),
            CheckoutError::Transient(_) => ApiError::new(
                ErrorCode::ServiceUnavailable,
                "Service temporarily unavailable, please retry",
            )
            .with_error(detail),
            CheckoutError::SessionNotFound(_) => {
                ApiError::new(ErrorCode::SessionNotFound, "Payment session not found")
                    .with_error(detail)
            }
            CheckoutError::CorruptMetadata { .. } => ApiError::new(
                ErrorCode::CorruptMetadata,
                "Error processing successful checkout",
            )
            .with_error(detail),
            CheckoutError::Processor(_) => {
                ApiError::new(ErrorCode::PaymentError, "Error processing checkout")
                    .with_error(detail)
            }
            CheckoutError::PartialSettlement { .. } => ApiError::new(
                ErrorCode::PartialSettlement,
                "Error processing successful checkout",
            )
            .with_error(detail),
            CheckoutError::Storage(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
                    .with_error(detail)
            }
            CheckoutError::InvalidReceiver(_) | CheckoutError::QrRender(_) => {
                tracing::error!(error = %detail, "PromptPay QR unavailable");
                ApiError::new(ErrorCode::Internal, "Error generating PromptPay QR")
                    .with_error(detail)
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::PoolExhausted | DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::ServiceUnavailable, "Database temporarily unavailable")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_checkout::RejectReason;

    #[test]
    fn test_checkout_error_status_mapping() {
        let cases = [
            (CheckoutError::InvalidCart("empty".into()), StatusCode::BAD_REQUEST),
            (CheckoutError::InvalidRequest("bad id".into()), StatusCode::BAD_REQUEST),
            (
                CheckoutError::SettlementRejected {
                    session_id: "cs_1".into(),
                    reason: RejectReason::Expired,
                },
                StatusCode::CONFLICT,
            ),
            (CheckoutError::Transient("timeout".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CheckoutError::Processor("declined".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CheckoutError::SessionNotFound("cs_1".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                CheckoutError::PartialSettlement {
                    session_id: "cs_1".into(),
                    reason: "disk full".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::from(CheckoutError::SettlementRejected {
            session_id: "cs_1".into(),
            reason: RejectReason::NoPaymentRequired,
        });
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "SETTLEMENT_REJECTED");
        assert_eq!(json["message"], "Payment was not completed: no payment required");
        assert!(json["error"].as_str().unwrap().contains("cs_1"));

        let json = serde_json::to_value(ApiError::unauthorized("Missing user")).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_db_errors() {
        assert_eq!(
            ApiError::from(DbError::PoolExhausted).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(DbError::QueryFailed("syntax".into())).code,
            ErrorCode::DatabaseError
        );
    }
}
