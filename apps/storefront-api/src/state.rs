//! Shared application state.
//!
//! Everything here is read-only after startup and cheap to clone into each
//! request; there is no global mutable state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use storefront_checkout::{CheckoutEngine, CheckoutSettings, PaymentProcessor};
use storefront_core::validation::validate_user_id;
use storefront_db::Database;

use crate::error::ApiError;

/// Header the upstream auth layer sets to the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: CheckoutEngine,
}

impl AppState {
    pub fn new(
        db: Database,
        processor: Arc<dyn PaymentProcessor>,
        settings: CheckoutSettings,
    ) -> Self {
        AppState {
            engine: CheckoutEngine::new(processor, db.clone(), settings),
            db,
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The authenticated user, from the `x-user-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        validate_user_id(value).map_err(|e| ApiError::unauthorized(e.to_string()))?;

        Ok(UserId(value.to_string()))
    }
}
