//! # Payment Routes
//!
//! Cart checkout, settlement on the redirect back, and the PromptPay QR rail.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use storefront_checkout::{QrRequest, QrSettlementToken, SettlementOutcome};
use storefront_core::CartLine;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, UserId};

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionRequest {
    pub products: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub url: Option<String>,
    /// Quote-currency major units.
    #[ts(type = "number")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSuccessRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Settled,
    Pending,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSuccessResponse {
    pub success: bool,
    pub status: SettlementStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub already_settled: Option<bool>,
}

impl CheckoutSuccessResponse {
    fn from_outcome(outcome: SettlementOutcome) -> (StatusCode, Self) {
        match outcome {
            SettlementOutcome::Settled {
                order_id,
                already_settled,
            } => (
                StatusCode::OK,
                CheckoutSuccessResponse {
                    success: true,
                    status: SettlementStatus::Settled,
                    message: "Payment successful and order created.".to_string(),
                    order_id: Some(order_id),
                    already_settled: Some(already_settled),
                },
            ),
            SettlementOutcome::Pending { .. } => (
                StatusCode::ACCEPTED,
                CheckoutSuccessResponse {
                    success: false,
                    status: SettlementStatus::Pending,
                    message: "Payment has not completed yet.".to_string(),
                    order_id: None,
                    already_settled: None,
                },
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayQrRequest {
    pub products: Vec<CartLine>,
    /// `amount` of the token currently on screen.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub pinned_amount: Option<Decimal>,
    /// `cartDigest` of the token currently on screen.
    #[serde(default)]
    pub pinned_digest: Option<String>,
}

/// `POST /api/payments/create-checkout-session`
pub async fn create_checkout_session(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: Result<Json<CreateCheckoutSessionRequest>, JsonRejection>,
) -> ApiResult<Json<CreateCheckoutSessionResponse>> {
    let Json(request) = payload.map_err(ApiError::from_cart_rejection)?;
    debug!(user_id = %user_id, lines = request.products.len(), "create_checkout_session");

    let session = state
        .engine
        .initiator
        .initiate(&user_id, &request.products)
        .await?;

    Ok(Json(CreateCheckoutSessionResponse {
        total_amount: session.total_amount(),
        id: session.session_id,
        url: session.url,
    }))
}

/// `POST /api/payments/checkout-success`
///
/// Safe to call any number of times for the same session. A session that
/// settles into another user's order is reported as not found.
pub async fn checkout_success(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: Result<Json<CheckoutSuccessRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutSuccessResponse>)> {
    let Json(request) = payload.map_err(ApiError::from_json_rejection)?;
    debug!(user_id = %user_id, session_id = %request.session_id, "checkout_success");

    let outcome = state.engine.reconciler.reconcile(&request.session_id).await?;

    if let SettlementOutcome::Settled { order_id, .. } = &outcome {
        let owner = state.db.orders().get_by_id(order_id).await?.map(|order| order.user_id);
        if owner.as_deref() != Some(user_id.as_str()) {
            warn!(
                user_id = %user_id,
                session_id = %request.session_id,
                "Settled session belongs to another user"
            );
            return Err(ApiError::not_found("Payment session", &request.session_id));
        }
    }

    let (status, body) = CheckoutSuccessResponse::from_outcome(outcome);

    Ok((status, Json(body)))
}

/// `POST /api/payments/promptpay-qr`
pub async fn promptpay_qr(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: Result<Json<PromptPayQrRequest>, JsonRejection>,
) -> ApiResult<Json<QrSettlementToken>> {
    let Json(request) = payload.map_err(ApiError::from_cart_rejection)?;
    debug!(user_id = %user_id, lines = request.products.len(), "promptpay_qr");

    let token = state.engine.qr.issue(&QrRequest {
        cart: request.products,
        pinned_amount: request.pinned_amount,
        pinned_digest: request.pinned_digest,
    })?;

    Ok(Json(token))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{json_body, post_json, send, test_app};
    use serde_json::json;

    const CREATE: &str = "/api/payments/create-checkout-session";
    const SUCCESS: &str = "/api/payments/checkout-success";
    const QR: &str = "/api/payments/promptpay-qr";

    fn cart() -> serde_json::Value {
        json!({
            "products": [
                {
                    "_id": "p-1",
                    "name": "Mug",
                    "image": "https://img/mug.png",
                    "price": 10.00,
                    "quantity": 2
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let app = test_app().await;
        let response = send(&app.router, post_json(CREATE, Some("u-1"), cart())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["id"].as_str().unwrap().starts_with("cs_mem_"));
        assert_eq!(body["totalAmount"].as_f64(), Some(20.0));
        assert!(body["url"].is_string());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_carts() {
        let app = test_app().await;

        for body in [
            json!({ "products": [] }),
            json!({ "products": "not-a-list" }),
            json!({}),
            json!({ "products": [{ "id": "p-1", "name": "Mug", "price": 10.0, "quantity": 0 }] }),
        ] {
            let response = send(&app.router, post_json(CREATE, Some("u-1"), body.clone())).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(json_body(response).await["code"], "INVALID_CART");
        }

        assert!(app.processor.create_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let app = test_app().await;
        let response = send(&app.router, post_json(CREATE, None, cart())).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_checkout_success_settles_once() {
        let app = test_app().await;
        let request = post_json(CREATE, Some("u-1"), cart());
        let created = json_body(send(&app.router, request).await).await;
        let session_id = created["id"].as_str().unwrap().to_string();

        // Shopper has not paid yet
        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["success"], false);

        app.processor.mark_paid(&session_id, None).await;

        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let first = json_body(send(&app.router, request).await).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["status"], "settled");
        assert_eq!(first["message"], "Payment successful and order created.");
        assert_eq!(first["alreadySettled"], false);

        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let second = json_body(send(&app.router, request).await).await;
        assert_eq!(second["orderId"], first["orderId"]);
        assert_eq!(second["alreadySettled"], true);

        assert_eq!(app.db.orders().count_by_session_id(&session_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkout_success_error_statuses() {
        let app = test_app().await;
        let request = post_json(CREATE, Some("u-1"), cart());
        let created = json_body(send(&app.router, request).await).await;
        let session_id = created["id"].as_str().unwrap().to_string();

        app.processor.expire(&session_id).await;
        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["code"], "SETTLEMENT_REJECTED");

        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": "cs_unknown" }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["code"], "SESSION_NOT_FOUND");
        assert!(body["error"].is_string());

        let response = send(&app.router, post_json(SUCCESS, Some("u-1"), json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        app.processor.set_unavailable(true);
        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_checkout_success_for_another_users_session() {
        let app = test_app().await;
        let request = post_json(CREATE, Some("u-1"), cart());
        let created = json_body(send(&app.router, request).await).await;
        let session_id = created["id"].as_str().unwrap().to_string();
        app.processor.mark_paid(&session_id, None).await;

        let request = post_json(SUCCESS, Some("u-2"), json!({ "sessionId": session_id }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("orderId").is_none());

        // The owner still gets the single order.
        let request = post_json(SUCCESS, Some("u-1"), json!({ "sessionId": session_id }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "settled");
        assert_eq!(app.db.orders().count_by_session_id(&session_id).await.unwrap(), 1);
    }

    fn qr_cart(price: f64, quantity: i64) -> serde_json::Value {
        json!([{ "_id": "p-1", "name": "Mug", "price": price, "quantity": quantity }])
    }

    #[tokio::test]
    async fn test_promptpay_qr() {
        let app = test_app().await;

        // 50.00 × 2, × 34 settlement rate
        let request = post_json(QR, Some("u-1"), json!({ "products": qr_cart(50.0, 2) }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let first = json_body(response).await;
        assert_eq!(first["receiver"], "xxxxxx5678");
        assert_eq!(first["amount"].as_f64(), Some(3400.0));
        assert!(first["payload"].as_str().unwrap().contains("54073400.00"));
        assert!(first["cartDigest"].as_str().unwrap().starts_with("c1~"));
        assert!(first["svg"].as_str().unwrap().contains("<svg"));
        assert!(first["expiresAt"].is_string());

        let request = post_json(QR, Some("u-1"), json!({ "products": qr_cart(50.0, 3) }));
        let second = json_body(send(&app.router, request).await).await;
        assert_ne!(first["payload"], second["payload"]);
        assert_ne!(first["cartDigest"], second["cartDigest"]);

        // Cart changed while the first code is still on screen
        let response = send(
            &app.router,
            post_json(
                QR,
                Some("u-1"),
                json!({ "products": qr_cart(50.0, 3), "pinnedAmount": first["amount"] }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "STALE_QR_AMOUNT");

        let response = send(
            &app.router,
            post_json(
                QR,
                Some("u-1"),
                json!({
                    "products": [{ "_id": "p-2", "name": "Tee", "price": 100.0, "quantity": 1 }],
                    "pinnedAmount": first["amount"],
                    "pinnedDigest": first["cartDigest"],
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "STALE_QR_CART");

        let request = post_json(QR, Some("u-1"), json!({ "products": [] }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_CART");

        let request = post_json(QR, Some("u-1"), json!({ "amount": 100.0 }));
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
