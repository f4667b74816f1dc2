//! # Checkout Settings
//!
//! Read-only settings shared by the initiator, the reconciler and the QR
//! issuer. Built once at startup and passed explicitly; nothing in the
//! engine reads the environment.
//!
//! ## Example
//! ```rust,ignore
//! let settings = CheckoutSettings::default()
//!     .client_url("https://shop.example.com")
//!     .settlement_rate(ConversionRate::new(dec!(34))?)
//!     .promptpay_receiver(Receiver::parse("0812345678")?);
//! ```

use chrono::Duration;
use rust_decimal::Decimal;

use storefront_core::promptpay::Receiver;
use storefront_core::{ConversionRate, Currency};

/// Placeholder the processor replaces with the real session id on redirect.
pub const CHECKOUT_SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Checkout engine settings.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Base URL of the web client; redirect targets hang off it.
    /// Default: `http://localhost:5173`
    pub client_url: String,

    /// Currency cart prices are quoted and charged in.
    /// Default: `thb`
    pub checkout_currency: Currency,

    /// Currency order lines are recorded in.
    /// Default: `thb`
    pub settlement_currency: Currency,

    /// Fixed quote → settlement multiplier.
    /// Default: 34
    pub settlement_rate: ConversionRate,

    /// Shipping address countries accepted on the payment page.
    /// Default: `TH`, `US`, `CA`
    pub shipping_countries: Vec<String>,

    /// PromptPay receiving identifier for the QR rail.
    /// Default: `0812345678`
    pub promptpay_receiver: Receiver,

    /// How long an issued QR token stays valid.
    /// Default: 15 minutes
    pub qr_ttl: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            client_url: "http://localhost:5173".to_string(),
            checkout_currency: Currency::thb(),
            settlement_currency: Currency::thb(),
            settlement_rate: ConversionRate::new(Decimal::from(34))
                .unwrap_or_else(|_| ConversionRate::identity()),
            shipping_countries: vec!["TH".to_string(), "US".to_string(), "CA".to_string()],
            promptpay_receiver: Receiver::Phone("0812345678".to_string()),
            qr_ttl: Duration::minutes(15),
        }
    }
}

impl CheckoutSettings {
    /// Sets the web client base URL. A trailing slash is dropped.
    pub fn client_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.client_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the checkout (quote) currency.
    pub fn checkout_currency(mut self, currency: Currency) -> Self {
        self.checkout_currency = currency;
        self
    }

    /// Sets the settlement currency.
    pub fn settlement_currency(mut self, currency: Currency) -> Self {
        self.settlement_currency = currency;
        self
    }

    /// Sets the fixed settlement rate.
    pub fn settlement_rate(mut self, rate: ConversionRate) -> Self {
        self.settlement_rate = rate;
        self
    }

    /// Sets the shipping allow-list. Codes are upper-cased.
    pub fn shipping_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shipping_countries = countries
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    /// Sets the PromptPay receiver.
    pub fn promptpay_receiver(mut self, receiver: Receiver) -> Self {
        self.promptpay_receiver = receiver;
        self
    }

    /// Sets the QR token lifetime.
    pub fn qr_ttl(mut self, ttl: Duration) -> Self {
        self.qr_ttl = ttl;
        self
    }

    /// Redirect target after a successful payment.
    pub fn success_url(&self) -> String {
        format!(
            "{}/purchase-success?session_id={}",
            self.client_url, CHECKOUT_SESSION_ID_PLACEHOLDER
        )
    }

    /// Redirect target when the shopper cancels.
    pub fn cancel_url(&self) -> String {
        format!("{}/purchase-cancel", self.client_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CheckoutSettings::default();
        assert_eq!(settings.settlement_rate.value(), Decimal::from(34));
        assert_eq!(settings.shipping_countries, vec!["TH", "US", "CA"]);
        assert_eq!(settings.qr_ttl, Duration::seconds(900));
        assert_eq!(settings.checkout_currency.code(), "thb");
    }

    #[test]
    fn test_redirect_urls() {
        let settings = CheckoutSettings::default().client_url("https://shop.example.com/");
        assert_eq!(
            settings.success_url(),
            "https://shop.example.com/purchase-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(settings.cancel_url(), "https://shop.example.com/purchase-cancel");
    }

    #[test]
    fn test_shipping_countries_normalized() {
        let settings = CheckoutSettings::default().shipping_countries(["th", " jp ", ""]);
        assert_eq!(settings.shipping_countries, vec!["TH", "JP"]);
    }
}
