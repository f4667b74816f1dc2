//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core (this file)                                           │
//! │  ├── CoreError        - Amount, snapshot and QR encoding failures      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db                                                         │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-checkout                                                   │
//! │  └── CheckoutError    - InvalidCart, SessionNotFound, Transient, ...   │
//! │                                                                         │
//! │  storefront-api                                                        │
//! │  └── ApiError         - What the web client sees (serialized)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An amount does not fit the minor-unit range once converted.
    ///
    /// ## When This Occurs
    /// - A price like `1e20` is posted as a cart line
    /// - `unit price × quantity` overflows `i64` satang
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// The session metadata snapshot cannot be trusted.
    ///
    /// ## When This Occurs
    /// - `products` is not valid JSON, or not an array of lines
    /// - `userId` is missing
    /// - The snapshot version is newer than this build understands
    #[error("Corrupt session metadata: {0}")]
    CorruptSnapshot(String),

    /// The PromptPay receiving identifier is not a phone, tax or e-wallet id.
    #[error("Invalid PromptPay receiver: {0}")]
    InvalidReceiver(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any processor call or database write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The cart has no lines.
    #[error("Invalid or empty products array")]
    EmptyCart,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "productId".to_string(),
        };
        assert_eq!(err.to_string(), "productId is required");

        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 999,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 999");

        assert_eq!(
            ValidationError::EmptyCart.to_string(),
            "Invalid or empty products array"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
