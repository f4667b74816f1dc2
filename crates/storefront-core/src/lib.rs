//! # storefront-core: Pure Checkout Logic
//!
//! Everything the checkout engine decides without touching the network or
//! the database lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Checkout Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web client (cart, pay buttons)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-api (axum routes)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   storefront-checkout (initiator, reconciler, QR issuer)        │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐  ┌────────────▼───────────────┐   │
//! │  │  ★ storefront-core (THIS) ★     │  │  storefront-db (SQLite)    │   │
//! │  │  money • currency • snapshot    │  │  orders, order_items       │   │
//! │  │  promptpay • validation         │  │                            │   │
//! │  └─────────────────────────────────┘  └────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Minor-unit `Money` type (integer arithmetic only)
//! - [`currency`] - Major/minor conversion and the fixed settlement rate
//! - [`types`] - Cart lines, orders, order items
//! - [`snapshot`] - Versioned session metadata snapshot
//! - [`promptpay`] - PromptPay (EMVCo) QR payload encoder
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use storefront_core::currency::to_minor_units;
//!
//! let unit = to_minor_units(Decimal::new(1099, 2)).unwrap(); // 10.99
//! assert_eq!(unit.minor(), 1099);
//! assert_eq!(unit.multiply_quantity(2).unwrap().minor(), 2198);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod currency;
pub mod error;
pub mod money;
pub mod promptpay;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::{ConversionRate, Currency};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use snapshot::{SessionSnapshot, SnapshotLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in one checkout.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches fat-finger quantities (1000 instead of 10) before they reach the
/// payment page.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Minor units per major unit for every currency the store accepts
/// (satang per baht, cents per dollar).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;
