//! HTTP routes.
//!
//! ```text
//! POST /api/payments/create-checkout-session   cart → payment session
//! POST /api/payments/checkout-success          session → order (idempotent)
//! POST /api/payments/promptpay-qr              amount → QR token
//! GET  /api/orders/{id}                        settled order (owner only)
//! GET  /health                                 liveness + database
//! ```

pub mod health;
pub mod orders;
pub mod payments;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Routes without middleware. See [`crate::build_router`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/payments/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/api/payments/checkout-success", post(payments::checkout_success))
        .route("/api/payments/promptpay-qr", post(payments::promptpay_qr))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/health", get(health::health))
}
