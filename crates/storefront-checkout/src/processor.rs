//! # Payment Processor Port
//!
//! The single seam between the checkout engine and the hosted card-payment
//! provider.
//!
//! ## Session Lifecycle (processor side)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_session ──► status: open, payment_status: unpaid                │
//! │                        │                                                │
//! │         shopper pays   │            shopper walks away                  │
//! │              ┌─────────┴──────────┐                                     │
//! │              ▼                    ▼                                     │
//! │   status: complete          status: expired                             │
//! │   payment_status: paid      payment_status: unpaid                      │
//! │   amount_total: 2000                                                    │
//! │                                                                         │
//! │  retrieve_session(id) returns whichever state the session is in;        │
//! │  classify() turns it into a SettlementDecision.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use storefront_core::{Currency, Money};

use crate::error::{CheckoutResult, RejectReason};

// =============================================================================
// Requests
// =============================================================================

/// One line on the hosted payment page.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub image: Option<String>,
    /// Unit amount in quote-currency minor units.
    pub unit_amount: Money,
    pub quantity: i64,
}

/// Everything needed to open a one-shot card payment session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionRequest {
    pub line_items: Vec<LineItem>,
    pub currency: Currency,
    pub success_url: String,
    pub cancel_url: String,
    /// ISO 3166-1 alpha-2 codes accepted for the shipping address.
    pub allowed_countries: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl CreateSessionRequest {
    /// Σ unit_amount × quantity, `None` on overflow.
    pub fn amount_total(&self) -> Option<Money> {
        self.line_items.iter().try_fold(Money::zero(), |acc, item| {
            item.unit_amount
                .multiply_quantity(item.quantity)
                .and_then(|line| acc.checked_add(line))
        })
    }
}

/// What the processor hands back after creating a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSession {
    pub id: String,
    /// Hosted payment page URL, when the processor returns one.
    pub url: Option<String>,
}

// =============================================================================
// Session State
// =============================================================================

/// Overall session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Complete,
    Expired,
}

/// Payment state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// A session as reported by the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedSession {
    pub id: String,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    /// Processor-confirmed total in minor units.
    pub amount_total: Option<Money>,
    pub currency: Option<String>,
    pub metadata: HashMap<String, String>,
}

// =============================================================================
// Settlement Decision
// =============================================================================

/// What the reconciler should do with a retrieved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementDecision {
    /// Paid: write the order.
    Settle,
    /// Not paid yet, but may still be. Write nothing.
    Pending,
    /// Will never be paid. Write nothing.
    Reject(RejectReason),
}

impl SettlementDecision {
    /// Classifies a session.
    ///
    /// ```text
    /// payment_status       status      → decision
    /// ──────────────────   ─────────   ─────────────────
    /// paid                 any         Settle
    /// unpaid               open        Pending
    /// unpaid               complete    Pending  (async payment in flight)
    /// unpaid               expired     Reject(Expired)
    /// no_payment_required  any         Reject(NoPaymentRequired)
    /// ```
    pub fn classify(session: &RetrievedSession) -> Self {
        match (session.payment_status, session.status) {
            (PaymentStatus::Paid, _) => SettlementDecision::Settle,
            (PaymentStatus::Unpaid, SessionStatus::Expired) => {
                SettlementDecision::Reject(RejectReason::Expired)
            }
            (PaymentStatus::Unpaid, SessionStatus::Open | SessionStatus::Complete) => {
                SettlementDecision::Pending
            }
            (PaymentStatus::NoPaymentRequired, _) => {
                SettlementDecision::Reject(RejectReason::NoPaymentRequired)
            }
        }
    }
}

// =============================================================================
// Port
// =============================================================================

/// The payment processor port.
///
/// Implementations must map failures onto the checkout taxonomy:
/// unknown session → `SessionNotFound`, timeouts / connect errors / 5xx /
/// 429 → `Transient`, any other rejection → `Processor`.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Opens a hosted payment session.
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> CheckoutResult<CreatedSession>;

    /// Fetches the current state of a session.
    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<RetrievedSession>;
}
