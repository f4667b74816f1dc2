//! # Order Routes
//!
//! Read-back of settled orders for the purchase-success page.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

use storefront_core::validation::validate_uuid;
use storefront_core::Order;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, UserId};

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    /// Settlement-currency major units.
    #[ts(type = "number")]
    pub total_amount: Decimal,
}

/// `GET /api/orders/{id}`
///
/// Orders owned by someone else, and ids that are not UUIDs, are reported
/// as not found.
pub async fn get_order(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    debug!(order_id = %id, user_id = %user_id, "get_order");

    if validate_uuid(&id).is_err() {
        return Err(ApiError::not_found("Order", &id));
    }

    let order = state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .filter(|order| order.user_id == user_id)
        .ok_or_else(|| ApiError::not_found("Order", &id))?;

    Ok(Json(OrderResponse {
        total_amount: order.total().to_major(),
        order,
    }))
}
