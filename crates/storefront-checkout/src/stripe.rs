//! # Stripe Checkout Adapter
//!
//! [`PaymentProcessor`] over the Stripe REST API (Checkout Sessions).
//!
//! ## Calls
//! ```text
//! create_session   POST {base}/v1/checkout/sessions       (form-encoded)
//! retrieve_session GET  {base}/v1/checkout/sessions/{id}
//!
//! Authorization: Bearer <secret key>
//! Stripe-Version: <pinned version>   (optional)
//! ```
//!
//! ## Failure Mapping
//! ```text
//! timeout / connect / send / body read  → CheckoutError::Transient
//!   (the timeout also covers a stalled response body)
//! 5xx / 429                             → CheckoutError::Transient
//! 404 or error.code = resource_missing  → CheckoutError::SessionNotFound (retrieve)
//! unbuildable request, undecodable 2xx  → CheckoutError::Processor
//! any other 4xx                         → CheckoutError::Processor
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use storefront_core::Money;

use crate::error::{CheckoutError, CheckoutResult};
use crate::processor::{
    CreateSessionRequest, CreatedSession, PaymentProcessor, PaymentStatus, RetrievedSession,
    SessionStatus,
};

/// Default Stripe API origin.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

// =============================================================================
// Settings
// =============================================================================

/// Connection settings for the Stripe adapter.
#[derive(Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub api_base: String,
    pub stripe_version: Option<String>,
    pub timeout: Duration,
}

impl StripeSettings {
    /// Settings with the default API base and a 15 s timeout.
    pub fn new(secret_key: impl Into<String>) -> Self {
        StripeSettings {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            stripe_version: None,
            timeout: Duration::from_millis(15_000),
        }
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn stripe_version(mut self, version: Option<String>) -> Self {
        self.stripe_version = version.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// The secret key never reaches a log line.
impl fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeSettings")
            .field("secret_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("stripe_version", &self.stripe_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    status: Option<SessionStatus>,
    payment_status: PaymentStatus,
    amount_total: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

// =============================================================================
// Processor
// =============================================================================

/// Stripe Checkout Sessions client.
#[derive(Debug, Clone)]
pub struct StripeProcessor {
    http: Client,
    settings: StripeSettings,
}

impl StripeProcessor {
    /// Builds the HTTP client (rustls, bounded timeout).
    pub fn new(settings: StripeSettings) -> CheckoutResult<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CheckoutError::Processor(format!("http client: {}", e)))?;

        Ok(StripeProcessor { http, settings })
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.settings.api_base)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&self.settings.secret_key);
        match &self.settings.stripe_version {
            Some(version) => builder.header("Stripe-Version", version),
            None => builder,
        }
    }
}

/// Flattens a session request into Stripe's bracketed form keys.
///
/// ```text
/// line_items[0][price_data][currency]=thb
/// line_items[0][price_data][unit_amount]=1000
/// line_items[0][price_data][product_data][name]=Mug
/// line_items[0][quantity]=2
/// metadata[userId]=...
/// ```
pub fn encode_create_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
    ];

    for (i, country) in request.allowed_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{}]", i),
            country.clone(),
        ));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        form.push((
            format!("{}[price_data][currency]", prefix),
            request.currency.code().to_string(),
        ));
        form.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.minor().to_string(),
        ));
        form.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        if let Some(image) = item.image.as_ref().filter(|s| !s.is_empty()) {
            form.push((
                format!("{}[price_data][product_data][images][0]", prefix),
                image.clone(),
            ));
        }
        form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    let mut keys: Vec<&String> = request.metadata.keys().collect();
    keys.sort();
    for key in keys {
        form.push((format!("metadata[{}]", key), request.metadata[key].clone()));
    }

    form
}

/// Classifies errors from `send()` and from reading the response body.
///
/// `is_request` is hyper failing mid-exchange. Building failures are
/// `is_builder` and never reach the network.
fn map_transport_error(err: reqwest::Error) -> CheckoutError {
    if err.is_builder() {
        return CheckoutError::Processor(format!("invalid stripe request: {}", err));
    }
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        return CheckoutError::Transient(format!("stripe unreachable: {}", err));
    }
    if err.is_decode() {
        return CheckoutError::Processor(format!("unexpected response: {}", err));
    }
    CheckoutError::Processor(err.to_string())
}

/// Maps a non-2xx response onto the checkout taxonomy.
async fn map_error_response(response: Response, session_id: Option<&str>) -> CheckoutError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<StripeErrorBody>(&body)
        .map(|b| b.error)
        .ok();

    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", status));
    let code = detail.as_ref().and_then(|d| d.code.clone());

    warn!(
        status = status.as_u16(),
        code = code.as_deref().unwrap_or(""),
        kind = detail.as_ref().and_then(|d| d.kind.as_deref()).unwrap_or(""),
        "Stripe request failed"
    );

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return CheckoutError::Transient(format!("stripe: {}", message));
    }

    if let Some(id) = session_id {
        if status == StatusCode::NOT_FOUND || code.as_deref() == Some("resource_missing") {
            return CheckoutError::SessionNotFound(id.to_string());
        }
    }

    CheckoutError::Processor(message)
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> CheckoutResult<CreatedSession> {
        let form = encode_create_form(request);
        debug!(lines = request.line_items.len(), "Creating Stripe checkout session");

        let response = self
            .authorized(self.http.post(self.sessions_url()))
            .form(&form)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_error_response(response, None).await);
        }

        let session: StripeSession = response.json().await.map_err(map_transport_error)?;

        Ok(CreatedSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<RetrievedSession> {
        debug!(session_id = %session_id, "Retrieving Stripe checkout session");

        let response = self
            .authorized(self.http.get(format!("{}/{}", self.sessions_url(), session_id)))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_error_response(response, Some(session_id)).await);
        }

        let session: StripeSession = response.json().await.map_err(map_transport_error)?;

        Ok(RetrievedSession {
            id: session.id,
            status: session.status.unwrap_or(SessionStatus::Open),
            payment_status: session.payment_status,
            amount_total: session.amount_total.map(Money::from_minor),
            currency: session.currency,
            metadata: session.metadata,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::LineItem;
    use storefront_core::Currency;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` to every connection, then holds the socket open.
    async fn canned_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(response.as_bytes()).await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    fn processor_at(base: &str) -> StripeProcessor {
        StripeProcessor::new(
            StripeSettings::new("sk_test")
                .api_base(base)
                .timeout(Duration::from_millis(300)),
        )
        .unwrap()
    }

    fn request() -> CreateSessionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), "u-1".to_string());
        metadata.insert("products".to_string(), "[]".to_string());

        CreateSessionRequest {
            line_items: vec![LineItem {
                name: "Mug".into(),
                image: Some("https://img/mug.png".into()),
                unit_amount: Money::from_minor(1000),
                quantity: 2,
            }],
            currency: Currency::thb(),
            success_url: "http://localhost:5173/purchase-success?session_id={CHECKOUT_SESSION_ID}"
                .into(),
            cancel_url: "http://localhost:5173/purchase-cancel".into(),
            allowed_countries: vec!["TH".into(), "US".into()],
            metadata,
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_encoding() {
        let form = encode_create_form(&request());

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "payment_method_types[0]"), Some("card"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("thb"));
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("1000"));
        assert_eq!(value(&form, "line_items[0][price_data][product_data][name]"), Some("Mug"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://img/mug.png")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(value(&form, "shipping_address_collection[allowed_countries][1]"), Some("US"));
        assert_eq!(value(&form, "metadata[userId]"), Some("u-1"));
    }

    #[test]
    fn test_session_wire_format() {
        let json = r#"{
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": null,
            "status": "complete",
            "payment_status": "paid",
            "amount_total": 2000,
            "currency": "thb",
            "metadata": {"userId": "u-1", "products": "[]"}
        }"#;
        let session: StripeSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.status, Some(SessionStatus::Complete));
        assert_eq!(session.payment_status, PaymentStatus::Paid);
        assert_eq!(session.amount_total, Some(2000));
    }

    #[test]
    fn test_settings_debug_redacts_key() {
        let settings = StripeSettings::new("sk_live_secret");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("sk_live_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_unreachable_processor_is_transient() {
        // Port 9 (discard) on localhost is closed on CI machines.
        let processor = StripeProcessor::new(
            StripeSettings::new("sk_test")
                .api_base("http://127.0.0.1:9")
                .timeout(Duration::from_millis(500)),
        )
        .unwrap();

        let err = processor.retrieve_session("cs_test_1").await.unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_stalled_body_is_transient() {
        let base = canned_server(concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: application/json\r\n",
            "content-length: 512\r\n\r\n",
            "{\"id\":",
        ))
        .await;

        let err = processor_at(&base).retrieve_session("cs_test_1").await.unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");

        let err = processor_at(&base).create_session(&request()).await.unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_processor_error() {
        let base = canned_server(concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: application/json\r\n",
            "content-length: 8\r\n\r\n",
            "not json",
        ))
        .await;

        let err = processor_at(&base).retrieve_session("cs_test_1").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Processor(_)), "got {err:?}");
    }
}
