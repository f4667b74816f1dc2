//! Storefront API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use storefront_checkout::{CheckoutSettings, StripeSettings};
use storefront_core::promptpay::Receiver;
use storefront_core::{ConversionRate, Currency};

/// Which payment processor backs the checkout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// Stripe Checkout Sessions over HTTPS.
    Stripe,
    /// In-process sessions that are paid immediately (local development).
    Memory,
}

/// Storefront API configuration.
///
/// No `Debug`: the Stripe secret key must not end up in a log line.
#[derive(Clone)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// Address to bind to
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// Web client origin, used for redirect URLs
    pub client_url: String,

    /// Payment processor selection
    pub processor: ProcessorKind,

    /// Stripe secret key. Required for `ProcessorKind::Stripe`.
    pub stripe_secret_key: Option<String>,

    /// Stripe API base URL
    pub stripe_api_base: String,

    /// Optional Stripe-Version header
    pub stripe_version: Option<String>,

    /// Per-call processor timeout
    pub processor_timeout: Duration,

    /// Currency the cart is quoted in
    pub checkout_currency: Currency,

    /// Currency orders are recorded in
    pub settlement_currency: Currency,

    /// Quote → settlement multiplier
    pub settlement_rate: ConversionRate,

    /// Shipping allow-list, ISO alpha-2
    pub shipping_countries: Vec<String>,

    /// PromptPay receiver (phone, tax id or e-wallet id)
    pub promptpay_receiver: Receiver,

    /// QR token lifetime
    pub qr_ttl: Duration,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let processor = match var("PAYMENT_PROCESSOR", "stripe").to_ascii_lowercase().as_str() {
            "stripe" => ProcessorKind::Stripe,
            "memory" => ProcessorKind::Memory,
            _ => return Err(ConfigError::InvalidValue("PAYMENT_PROCESSOR".to_string())),
        };

        let config = ApiConfig {
            http_port: var("HTTP_PORT", "5000")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            bind_addr: var("BIND_ADDR", "0.0.0.0"),

            database_path: var("DATABASE_PATH", "./storefront.db"),

            client_url: var("CLIENT_URL", "http://localhost:5173"),

            processor,

            stripe_secret_key: lookup("STRIPE_SECRET_KEY").filter(|key| !key.trim().is_empty()),

            stripe_api_base: var("STRIPE_API_BASE", storefront_checkout::stripe::DEFAULT_API_BASE),

            stripe_version: lookup("STRIPE_VERSION").filter(|v| !v.trim().is_empty()),

            processor_timeout: var("PROCESSOR_TIMEOUT_MS", "15000")
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue("PROCESSOR_TIMEOUT_MS".to_string()))?,

            checkout_currency: var("CHECKOUT_CURRENCY", "thb")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHECKOUT_CURRENCY".to_string()))?,

            settlement_currency: var("SETTLEMENT_CURRENCY", "thb")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SETTLEMENT_CURRENCY".to_string()))?,

            settlement_rate: Decimal::from_str(&var("SETTLEMENT_RATE", "34"))
                .ok()
                .and_then(|rate| ConversionRate::new(rate).ok())
                .ok_or_else(|| ConfigError::InvalidValue("SETTLEMENT_RATE".to_string()))?,

            shipping_countries: var("SHIPPING_COUNTRIES", "TH,US,CA")
                .split(',')
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),

            promptpay_receiver: Receiver::parse(&var("PROMPTPAY_ID", "0812345678"))
                .map_err(|_| ConfigError::InvalidValue("PROMPTPAY_ID".to_string()))?,

            qr_ttl: var("QR_TTL_SECS", "900")
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue("QR_TTL_SECS".to_string()))?,
        };

        if config.processor == ProcessorKind::Stripe && config.stripe_secret_key.is_none() {
            return Err(ConfigError::MissingRequired("STRIPE_SECRET_KEY".to_string()));
        }

        if config.shipping_countries.iter().any(|c| c.len() != 2) {
            return Err(ConfigError::InvalidValue("SHIPPING_COUNTRIES".to_string()));
        }

        if config.qr_ttl.is_zero() {
            return Err(ConfigError::InvalidValue("QR_TTL_SECS".to_string()));
        }

        Ok(config)
    }

    /// Socket address the server listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string()))
    }

    /// Settings for the checkout engine.
    pub fn checkout_settings(&self) -> Result<CheckoutSettings, ConfigError> {
        let qr_ttl = chrono::Duration::from_std(self.qr_ttl)
            .map_err(|_| ConfigError::InvalidValue("QR_TTL_SECS".to_string()))?;

        Ok(CheckoutSettings::default()
            .client_url(self.client_url.clone())
            .checkout_currency(self.checkout_currency.clone())
            .settlement_currency(self.settlement_currency.clone())
            .settlement_rate(self.settlement_rate)
            .shipping_countries(self.shipping_countries.clone())
            .promptpay_receiver(self.promptpay_receiver.clone())
            .qr_ttl(qr_ttl))
    }

    /// Settings for the Stripe adapter, if a key is configured.
    pub fn stripe_settings(&self) -> Option<StripeSettings> {
        self.stripe_secret_key.as_ref().map(|key| {
            StripeSettings::new(key.clone())
                .api_base(self.stripe_api_base.clone())
                .stripe_version(self.stripe_version.clone())
                .timeout(self.processor_timeout)
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
