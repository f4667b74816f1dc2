//! # PromptPay QR Issuer
//!
//! The alternate settlement rail: a scannable bank-transfer code for the
//! current cart. The amount is priced here from the cart lines, the same way
//! the initiator prices a session, then converted at the settlement rate.
//! Tokens are issued only; nothing confirms the transfer and no order is ever
//! written from here.
//!
//! ## Staleness Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  client shows token { amount: 3400.00, cartDigest: c1~A }               │
//! │       │                                                                 │
//! │  cart changes (digest c1~B, amount 5100.00)                             │
//! │       │                                                                 │
//! │  issue { cart, pinned_amount: 3400.00, pinned_digest: c1~A }            │
//! │       └──► StaleQrAmount / StaleQrCart  (payer may be scanning c1~A)    │
//! │                                                                         │
//! │  issue { cart }  (client drops the old code first)                      │
//! │       └──► new token, new payload, new digest, new expiry               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use storefront_core::currency::{convert, to_minor_units};
use storefront_core::promptpay::generate_payload;
use storefront_core::snapshot::cart_digest;
use storefront_core::validation::{validate_cart, validate_payment_amount};
use storefront_core::{CartLine, SnapshotLine};

use crate::config::CheckoutSettings;
use crate::error::{CheckoutError, CheckoutResult};
use crate::initiator::quote_total;

/// Pixel size the SVG is rendered at, at minimum.
const QR_MIN_DIMENSION: u32 = 240;

/// A QR request from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct QrRequest {
    /// Cart the code pays for.
    pub cart: Vec<CartLine>,
    /// Amount of the code currently on screen, if any.
    pub pinned_amount: Option<Decimal>,
    /// Cart digest of the code currently on screen, if any.
    pub pinned_digest: Option<String>,
}

/// An issued, immutable QR settlement token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrSettlementToken {
    pub payload: String,
    /// Settlement-currency major units.
    pub amount: Decimal,
    /// Digest of the cart lines the amount was priced from.
    pub cart_digest: String,
    /// Receiver with all but the last four digits hidden.
    pub receiver: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub svg: String,
}

/// Issues PromptPay tokens for the configured receiver.
#[derive(Clone)]
pub struct QrIssuer {
    settings: Arc<CheckoutSettings>,
}

impl QrIssuer {
    pub fn new(settings: Arc<CheckoutSettings>) -> Self {
        QrIssuer { settings }
    }

    /// Issues a token now.
    pub fn issue(&self, request: &QrRequest) -> CheckoutResult<QrSettlementToken> {
        self.issue_at(request, Utc::now())
    }

    /// Issues a token as of `now`.
    pub fn issue_at(
        &self,
        request: &QrRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResult<QrSettlementToken> {
        let amount = self.settlement_amount(&request.cart)?;
        let lines: Vec<SnapshotLine> = request.cart.iter().map(SnapshotLine::from).collect();
        let digest = cart_digest(&lines)?;

        if let Some(pinned) = request.pinned_amount {
            let pinned = normalize(pinned)?;
            if pinned != amount {
                return Err(CheckoutError::StaleQrAmount {
                    pinned,
                    requested: amount,
                });
            }
        }
        if let Some(pinned) = &request.pinned_digest {
            if *pinned != digest {
                return Err(CheckoutError::StaleQrCart {
                    pinned: pinned.clone(),
                    current: digest,
                });
            }
        }

        let receiver = &self.settings.promptpay_receiver;
        let payload = generate_payload(receiver, Some(amount))?;
        let svg = render_svg(&payload)?;

        let token = QrSettlementToken {
            payload,
            amount,
            cart_digest: digest,
            receiver: receiver.masked(),
            issued_at: now,
            expires_at: now + self.settings.qr_ttl,
            svg,
        };

        info!(
            receiver = %token.receiver,
            amount = %token.amount,
            cart_digest = %token.cart_digest,
            lines = request.cart.len(),
            expires_at = %token.expires_at,
            "PromptPay QR issued"
        );

        Ok(token)
    }

    /// Σ round(price × 100) × qty in the quote currency, then × rate,
    /// rounded once to whole satang.
    fn settlement_amount(&self, cart: &[CartLine]) -> CheckoutResult<Decimal> {
        validate_cart(cart)?;
        let quote = quote_total(cart)?;
        let converted = to_minor_units(convert(quote.to_major(), self.settings.settlement_rate)?)?;
        if !converted.is_positive() {
            return Err(CheckoutError::InvalidCart(
                "cart total must be greater than zero".to_string(),
            ));
        }
        Ok(converted.to_major())
    }
}

/// Rounds to whole satang and rejects non-positive amounts.
fn normalize(amount: Decimal) -> CheckoutResult<Decimal> {
    validate_payment_amount(amount).map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
    let minor = to_minor_units(amount).map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
    if !minor.is_positive() {
        return Err(CheckoutError::InvalidRequest(
            "amount rounds to zero".to_string(),
        ));
    }
    Ok(minor.to_major())
}

fn render_svg(payload: &str) -> CheckoutResult<String> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| CheckoutError::QrRender(e.to_string()))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build())
}

// =============================================================================
// Unit Tests
// =============================================================================
