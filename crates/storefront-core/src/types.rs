//! # Domain Types
//!
//! Core domain types used throughout the checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐   ┌─────────────────┐  │
//! │  │    CartLine     │        │      Order      │   │    OrderItem    │  │
//! │  │  ─────────────  │        │  ─────────────  │   │  ─────────────  │  │
//! │  │  product_id     │ settle │  id (UUID)      │ 1:N  product_id     │  │
//! │  │  name, image    │ ─────► │  user_id        │──►│  quantity       │  │
//! │  │  price (quote)  │        │  session_id (U) │   │  unit_price     │  │
//! │  │  quantity       │        │  total_minor    │   │  (settlement)   │  │
//! │  └─────────────────┘        └─────────────────┘   └─────────────────┘  │
//! │   ephemeral, client-owned     immutable once written                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the shopper's cart as posted at checkout.
///
/// The legacy web client posts catalog documents straight from its cart
/// store, so the product reference arrives as `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog product reference.
    #[serde(alias = "_id", alias = "id")]
    pub product_id: String,

    /// Display name shown on the hosted payment page.
    pub name: String,

    /// Product image URL shown on the hosted payment page.
    #[serde(default)]
    pub image: Option<String>,

    /// Unit price in quote-currency major units.
    #[ts(type = "number")]
    pub price: Decimal,

    /// Number of units.
    pub quantity: i64,
}

// =============================================================================
// Order
// =============================================================================

/// A settled order.
///
/// Written exactly once per payment session by the reconciler and never
/// updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// External payment session identifier (idempotency key).
    pub session_id: String,
    /// Settlement currency code.
    pub currency: String,
    /// Processor-confirmed total in settlement minor units.
    pub total_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line of a settled order, frozen from the session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in settlement minor units.
    pub unit_price_minor: i64,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_minor(self.unit_price_minor)
    }
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
