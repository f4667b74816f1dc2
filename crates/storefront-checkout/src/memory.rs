//! # In-Memory Processor
//!
//! A [`PaymentProcessor`] that keeps sessions in a map. Used by the tests
//! and by local development (`PAYMENT_PROCESSOR=memory`), where there is no
//! hosted payment page and sessions can be marked paid immediately.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use storefront_core::Money;

use crate::error::{CheckoutError, CheckoutResult};
use crate::processor::{
    CreateSessionRequest, CreatedSession, PaymentProcessor, PaymentStatus, RetrievedSession,
    SessionStatus,
};

/// Thread-safe in-memory processor.
#[derive(Default, Clone)]
pub struct InMemoryProcessor {
    sessions: Arc<RwLock<HashMap<String, RetrievedSession>>>,
    requests: Arc<RwLock<Vec<CreateSessionRequest>>>,
    next_id: Arc<AtomicU64>,
    auto_pay: bool,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryProcessor {
    /// Creates an empty processor. Sessions start open and unpaid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions are created already complete and paid.
    pub fn auto_pay(mut self, auto_pay: bool) -> Self {
        self.auto_pay = auto_pay;
        self
    }

    /// Makes every call fail with `Transient` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts or replaces a session.
    pub async fn insert_session(&self, session: RetrievedSession) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    /// Marks a session complete and paid, optionally overriding the total.
    pub async fn mark_paid(&self, session_id: &str, amount_total: Option<Money>) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.status = SessionStatus::Complete;
            session.payment_status = PaymentStatus::Paid;
            if amount_total.is_some() {
                session.amount_total = amount_total;
            }
        }
    }

    /// Expires an unpaid session.
    pub async fn expire(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.status = SessionStatus::Expired;
        }
    }

    /// Replaces a session's metadata.
    pub async fn set_metadata(&self, session_id: &str, metadata: HashMap<String, String>) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.metadata = metadata;
        }
    }

    /// Every create request received so far, in order.
    pub async fn create_requests(&self) -> Vec<CreateSessionRequest> {
        self.requests.read().await.clone()
    }

    fn check_available(&self) -> CheckoutResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CheckoutError::Transient("processor unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryProcessor {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> CheckoutResult<CreatedSession> {
        self.check_available()?;

        let amount_total = request
            .amount_total()
            .ok_or_else(|| CheckoutError::Processor("amount_total overflow".to_string()))?;

        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_mem_{:06}", seq);

        let (status, payment_status) = if self.auto_pay {
            (SessionStatus::Complete, PaymentStatus::Paid)
        } else {
            (SessionStatus::Open, PaymentStatus::Unpaid)
        };

        self.insert_session(RetrievedSession {
            id: id.clone(),
            status,
            payment_status,
            amount_total: Some(amount_total),
            currency: Some(request.currency.code().to_string()),
            metadata: request.metadata.clone(),
        })
        .await;
        self.requests.write().await.push(request.clone());

        let url = request
            .success_url
            .replace(crate::config::CHECKOUT_SESSION_ID_PLACEHOLDER, &id);

        Ok(CreatedSession { id, url: Some(url) })
    }

    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<RetrievedSession> {
        self.check_available()?;

        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CheckoutError::SessionNotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::LineItem;
    use storefront_core::Currency;

    fn request() -> CreateSessionRequest {
        CreateSessionRequest {
            line_items: vec![LineItem {
                name: "Mug".into(),
                image: None,
                unit_amount: Money::from_minor(1000),
                quantity: 2,
            }],
            currency: Currency::thb(),
            success_url: "http://shop/purchase-success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://shop/purchase-cancel".into(),
            allowed_countries: vec!["TH".into()],
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let processor = InMemoryProcessor::new();
        let created = processor.create_session(&request()).await.unwrap();
        assert_eq!(
            created.url.as_deref(),
            Some(format!("http://shop/purchase-success?session_id={}", created.id).as_str())
        );

        let session = processor.retrieve_session(&created.id).await.unwrap();
        assert_eq!(session.payment_status, PaymentStatus::Unpaid);
        assert_eq!(session.amount_total, Some(Money::from_minor(2000)));

        processor.mark_paid(&created.id, None).await;
        let session = processor.retrieve_session(&created.id).await.unwrap();
        assert_eq!(session.payment_status, PaymentStatus::Paid);
        assert_eq!(session.status, SessionStatus::Complete);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let processor = InMemoryProcessor::new();
        assert!(matches!(
            processor.retrieve_session("cs_nope").await,
            Err(CheckoutError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_is_transient() {
        let processor = InMemoryProcessor::new();
        processor.set_unavailable(true);
        let err = processor.create_session(&request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(processor.create_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_auto_pay() {
        let processor = InMemoryProcessor::new().auto_pay(true);
        let created = processor.create_session(&request()).await.unwrap();
        let session = processor.retrieve_session(&created.id).await.unwrap();
        assert_eq!(session.payment_status, PaymentStatus::Paid);
    }
}
