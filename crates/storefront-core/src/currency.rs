//! # Currency Normalizer
//!
//! Conversions between the price the shopper sees (decimal major units in the
//! quote currency) and the amounts the store settles in.
//!
//! ## Conversion Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Session Initiator                                                     │
//! │    cart price 10.99 (quote) ──► to_minor_units ──► 1099 per unit       │
//! │                                                                         │
//! │  Settlement Reconciler                                                 │
//! │    snapshot price 10.99 (quote)                                        │
//! │         │  convert(× fixed rate)                                       │
//! │         ▼                                                               │
//! │    373.66 (settlement) ──► to_minor_units ──► 37366 per unit           │
//! │                                                                         │
//! │  Order total: processor amount_total, NEVER Σ converted lines          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding is half-up (midpoint away from zero) and is applied exactly once
//! per line item.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::MINOR_UNITS_PER_MAJOR;

// =============================================================================
// Currency
// =============================================================================

/// A lower-case ISO 4217 currency code as the payment processor expects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Thai baht, the store's default settlement currency.
    pub fn thb() -> Self {
        Currency("thb".to_string())
    }

    /// Returns the code, e.g. `"thb"`.
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: format!("'{}' is not a three-letter ISO code", s),
            });
        }
        Ok(Currency(code))
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Conversion Rate
// =============================================================================

/// Fixed quote → settlement multiplier.
///
/// Configured once at startup; there is no live FX lookup anywhere in the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate(Decimal);

impl ConversionRate {
    /// Creates a rate. Must be strictly positive.
    pub fn new(rate: Decimal) -> Result<Self, ValidationError> {
        if rate <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: "conversion rate".to_string(),
            });
        }
        Ok(ConversionRate(rate))
    }

    /// The identity rate (quote and settlement currency are the same).
    pub fn identity() -> Self {
        ConversionRate(Decimal::ONE)
    }

    /// Returns the raw multiplier.
    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        ConversionRate::identity()
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Rounds a major-unit amount to the nearest minor unit, half-up.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use storefront_core::currency::to_minor_units;
///
/// assert_eq!(to_minor_units(Decimal::new(10005, 3)).unwrap().minor(), 1001); // 10.005
/// assert_eq!(to_minor_units(Decimal::new(10004, 3)).unwrap().minor(), 1000); // 10.004
/// ```
pub fn to_minor_units(amount: Decimal) -> CoreResult<Money> {
    let scaled = amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or_else(|| CoreError::AmountOutOfRange(amount.to_string()))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    scaled
        .to_i64()
        .map(Money::from_minor)
        .ok_or_else(|| CoreError::AmountOutOfRange(amount.to_string()))
}

/// Exact major-unit value of a minor-unit amount.
#[inline]
pub fn to_major_units(money: Money) -> Decimal {
    money.to_major()
}

/// Multiplies a quote-currency amount by the fixed rate. No rounding.
pub fn convert(amount: Decimal, rate: ConversionRate) -> CoreResult<Decimal> {
    amount
        .checked_mul(rate.value())
        .ok_or_else(|| CoreError::AmountOutOfRange(format!("{} × {}", amount, rate.value())))
}

/// Converts one quote-currency unit price into settlement minor units.
///
/// This is the single rounding point for a reconciled line.
pub fn settlement_unit_price(quote_price: Decimal, rate: ConversionRate) -> CoreResult<Money> {
    to_minor_units(convert(quote_price, rate)?)
}

// =============================================================================
// Unit Tests
// =============================================================================
