//! # storefront-api
//!
//! HTTP surface of the checkout engine.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upstream auth (sets x-user-id)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer ──► Router<AppState> ──► handler ──► CheckoutEngine         │
//! │                                         │                               │
//! │                                         └── ApiError → status + JSON    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, ConfigError, ProcessorKind};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::{AppState, UserId, USER_ID_HEADER};

/// Builds the application router with per-request tracing.
pub fn build_router(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
