//! # Validation Module
//!
//! Checkout input validation. Everything here runs before the payment
//! processor is called or a row is written.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP body (serde)      shape: products is an array of line objects    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  THIS MODULE            business rules: non-empty, qty 1..=999,         │
//! │        │                price ≥ 0, ids and names present                │
//! │        ▼                                                                │
//! │  SQLite                 UNIQUE(session_id), NOT NULL, foreign keys      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use storefront_core::validation::{validate_quantity, validate_session_id};
//!
//! validate_quantity(5).unwrap();
//! validate_session_id("cs_test_a1b2c3").unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::CartLine;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a catalog product reference.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_product_id;
///
/// assert!(validate_product_id("64f1c0aa9e").is_ok());
/// assert!(validate_product_id("  ").is_err());
/// ```
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "productId".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "productId".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a product display name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an external payment session id.
///
/// Ids are opaque, but they end up in a URL path so only URL-safe
/// characters are accepted.
pub fn validate_session_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "sessionId".to_string(),
        });
    }

    if id.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "sessionId".to_string(),
            max: 255,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sessionId".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates the authenticated user id handed over by the auth layer.
pub fn validate_user_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "userId".to_string(),
        });
    }

    if id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "userId".to_string(),
            max: 128,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in major units. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use storefront_core::validation::validate_price;
///
/// assert!(validate_price(Decimal::new(1099, 2)).is_ok());
/// assert!(validate_price(Decimal::ZERO).is_ok());
/// assert!(validate_price(Decimal::new(-1, 0)).is_err());
/// ```
pub fn validate_price(price: Decimal) -> ValidationResult<()> {
    if price < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates an amount that will be charged. Must be > 0.
pub fn validate_payment_amount(amount: Decimal) -> ValidationResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a whole cart: size limits first, then every line.
///
/// ## Rules
/// - At least one line
/// - At most MAX_CART_LINES (100) lines
/// - Every line has an id, a name, a price ≥ 0 and a quantity in 1..=999
pub fn validate_cart(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    if lines.len() > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }

    for line in lines {
        validate_product_id(&line.product_id)?;
        validate_product_name(&line.name)?;
        validate_price(line.price)?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (order ids).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i64) -> CartLine {
        CartLine {
            product_id: "p-1".into(),
            name: "Mug".into(),
            image: None,
            price,
            quantity,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(dec!(0)).is_ok());
        assert!(validate_price(dec!(10.99)).is_ok());
        assert!(validate_price(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("cs_test_a1B2c3").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("cs_test/../../admin").is_err());
        assert!(validate_session_id(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_cart() {
        assert!(validate_cart(&[line(dec!(10.00), 2)]).is_ok());
        assert!(matches!(validate_cart(&[]), Err(ValidationError::EmptyCart)));
        assert!(validate_cart(&[line(dec!(10.00), 0)]).is_err());
        assert!(validate_cart(&[line(dec!(-1), 1)]).is_err());

        let too_many: Vec<CartLine> = (0..=MAX_CART_LINES).map(|_| line(dec!(1), 1)).collect();
        assert!(validate_cart(&too_many).is_err());
    }

    #[test]
    fn test_validate_cart_requires_id_and_name() {
        let mut no_id = line(dec!(1), 1);
        no_id.product_id = " ".into();
        assert!(validate_cart(&[no_id]).is_err());

        let mut no_name = line(dec!(1), 1);
        no_name.name = String::new();
        assert!(validate_cart(&[no_name]).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(dec!(0.01)).is_ok());
        assert!(validate_payment_amount(dec!(0)).is_err());
    }
}
