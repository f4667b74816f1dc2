//! # Session Initiator
//!
//! Cart → hosted payment session. Nothing is persisted here; calling it
//! twice simply opens two sessions.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  initiate(user_id, cart)                                                │
//! │    │                                                                    │
//! │    ├── validate_cart           empty / >100 lines / qty / price         │
//! │    │                           (no processor call on failure)           │
//! │    ├── per line:  unit = to_minor_units(price)      ← single rounding   │
//! │    │              total += unit × quantity          (checked)           │
//! │    ├── total == 0?  → InvalidCart                                       │
//! │    ├── SessionSnapshot::from_cart → metadata (userId, products…, v2)    │
//! │    └── processor.create_session(...)                                    │
//! │                                                                         │
//! │  → InitiatedSession { session_id, url, total }                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use storefront_core::currency::to_minor_units;
use storefront_core::validation::{validate_cart, validate_user_id};
use storefront_core::{CartLine, Money, SessionSnapshot};

use crate::config::CheckoutSettings;
use crate::error::{CheckoutError, CheckoutResult};
use crate::processor::{CreateSessionRequest, LineItem, PaymentProcessor};

/// A freshly opened payment session.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiatedSession {
    pub session_id: String,
    pub url: Option<String>,
    /// Authoritative total in quote-currency minor units.
    pub total: Money,
}

impl InitiatedSession {
    /// Total in major units, as the web client displays it.
    pub fn total_amount(&self) -> Decimal {
        self.total.to_major()
    }
}

/// Prices a cart: Σ round(price × 100) × quantity, in minor units.
///
/// ## Example
/// ```rust,ignore
/// // [{price: 10.00, qty: 2}] → 2000
/// assert_eq!(quote_total(&cart)?.minor(), 2000);
/// ```
pub fn quote_total(cart: &[CartLine]) -> CheckoutResult<Money> {
    let mut total = Money::zero();
    for line in cart {
        let unit = to_minor_units(line.price)?;
        total = unit
            .multiply_quantity(line.quantity)
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| CheckoutError::InvalidCart("cart total out of range".to_string()))?;
    }
    Ok(total)
}

/// Builds payment sessions from carts.
#[derive(Clone)]
pub struct SessionInitiator {
    processor: Arc<dyn PaymentProcessor>,
    settings: Arc<CheckoutSettings>,
}

impl SessionInitiator {
    pub fn new(processor: Arc<dyn PaymentProcessor>, settings: Arc<CheckoutSettings>) -> Self {
        SessionInitiator {
            processor,
            settings,
        }
    }

    /// Builds the processor request without sending it.
    pub fn build_request(
        &self,
        user_id: &str,
        cart: &[CartLine],
    ) -> CheckoutResult<CreateSessionRequest> {
        validate_user_id(user_id).map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
        validate_cart(cart)?;

        let mut line_items = Vec::with_capacity(cart.len());
        for line in cart {
            line_items.push(LineItem {
                name: line.name.trim().to_string(),
                image: line.image.clone(),
                unit_amount: to_minor_units(line.price)?,
                quantity: line.quantity,
            });
        }

        if !quote_total(cart)?.is_positive() {
            return Err(CheckoutError::InvalidCart(
                "cart total must be greater than zero".to_string(),
            ));
        }

        let metadata = SessionSnapshot::from_cart(user_id, cart).to_metadata()?;

        Ok(CreateSessionRequest {
            line_items,
            currency: self.settings.checkout_currency.clone(),
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
            allowed_countries: self.settings.shipping_countries.clone(),
            metadata,
        })
    }

    /// Validates the cart and opens a payment session for it.
    pub async fn initiate(
        &self,
        user_id: &str,
        cart: &[CartLine],
    ) -> CheckoutResult<InitiatedSession> {
        let request = self.build_request(user_id, cart)?;
        let total = quote_total(cart)?;

        let created = self.processor.create_session(&request).await?;

        info!(
            session_id = %created.id,
            user_id = %user_id,
            total_minor = total.minor(),
            lines = cart.len(),
            processor = self.processor.name(),
            "Payment session created"
        );

        Ok(InitiatedSession {
            session_id: created.id,
            url: created.url,
            total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProcessor;
    use rust_decimal_macros::dec;
    use storefront_core::snapshot::{PRODUCTS_KEY, USER_ID_KEY};

    fn line(id: &str, price: Decimal, quantity: i64) -> CartLine {
        CartLine {
            product_id: id.into(),
            name: format!("Product {}", id),
            image: Some(format!("https://img/{}.png", id)),
            price,
            quantity,
        }
    }

    fn initiator(processor: &InMemoryProcessor) -> SessionInitiator {
        SessionInitiator::new(
            Arc::new(processor.clone()),
            Arc::new(CheckoutSettings::default()),
        )
    }

    #[test]
    fn test_quote_total_rounds_per_line() {
        let cart = vec![line("a", dec!(10.00), 2)];
        assert_eq!(quote_total(&cart).unwrap().minor(), 2000);

        // 0.005 → 1 satang per unit, × 3
        let cart = vec![line("a", dec!(0.005), 3), line("b", dec!(10.99), 1)];
        assert_eq!(quote_total(&cart).unwrap().minor(), 3 + 1099);
    }

    #[test]
    fn test_quote_total_matches_sum_of_rounded_lines() {
        let prices = [dec!(0.01), dec!(1.005), dec!(19.99), dec!(249.5), dec!(0.333)];
        for (i, price) in prices.iter().enumerate() {
            for qty in 1..=5 {
                let next = prices[(i + 1) % prices.len()];
                let cart = vec![line("a", *price, qty), line("b", next, 1)];
                let expected: i64 = cart
                    .iter()
                    .map(|l| to_minor_units(l.price).unwrap().minor() * l.quantity)
                    .sum();
                assert_eq!(quote_total(&cart).unwrap().minor(), expected);
            }
        }
    }

    #[tokio::test]
    async fn test_initiate_scenario() {
        let processor = InMemoryProcessor::new();
        let session = initiator(&processor)
            .initiate("u-1", &[line("p-1", dec!(10.00), 2)])
            .await
            .unwrap();

        assert_eq!(session.total.minor(), 2000);
        assert_eq!(session.total_amount(), dec!(20.00));
        assert!(session.session_id.starts_with("cs_mem_"));

        let requests = processor.create_requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.line_items[0].unit_amount.minor(), 1000);
        assert_eq!(request.line_items[0].quantity, 2);
        assert_eq!(request.currency.code(), "thb");
        assert_eq!(request.allowed_countries, vec!["TH", "US", "CA"]);
        assert!(request
            .success_url
            .ends_with("/purchase-success?session_id={CHECKOUT_SESSION_ID}"));
        assert_eq!(request.metadata.get(USER_ID_KEY).unwrap(), "u-1");

        let products: serde_json::Value =
            serde_json::from_str(request.metadata.get(PRODUCTS_KEY).unwrap()).unwrap();
        assert_eq!(products[0]["id"], "p-1");
        assert_eq!(products[0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_invalid_cart_never_reaches_processor() {
        let processor = InMemoryProcessor::new();
        let initiator = initiator(&processor);

        for cart in [
            vec![],
            vec![line("p-1", dec!(10.00), 0)],
            vec![line("p-1", dec!(-1.00), 1)],
            vec![line("", dec!(1.00), 1)],
            vec![line("p-1", dec!(0), 1)],
        ] {
            let err = initiator.initiate("u-1", &cart).await.unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidCart(_)), "got {err:?}");
        }

        assert!(processor.create_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_is_rejected() {
        let processor = InMemoryProcessor::new();
        let err = initiator(&processor)
            .initiate(" ", &[line("p-1", dec!(1.00), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_processor_outage_is_retryable() {
        let processor = InMemoryProcessor::new();
        processor.set_unavailable(true);
        let err = initiator(&processor)
            .initiate("u-1", &[line("p-1", dec!(1.00), 1)])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
