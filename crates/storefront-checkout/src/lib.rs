//! # storefront-checkout: Checkout & Settlement Engine
//!
//! Cart → payment session → exactly one order, plus the PromptPay QR rail.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CheckoutEngine                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────────┐   ┌────────────────┐  │
//! │  │ SessionInitiator │   │ SettlementReconciler │   │   QrIssuer     │  │
//! │  │ cart → session   │   │ session → Order      │   │ cart → token   │  │
//! │  └────────┬─────────┘   └──────┬─────────┬─────┘   └────────────────┘  │
//! │           │                    │         │                              │
//! │           ▼                    ▼         ▼                              │
//! │  ┌──────────────────────────────────┐  ┌────────────────────────────┐  │
//! │  │ Arc<dyn PaymentProcessor>        │  │ storefront-db::Database    │  │
//! │  │  ├── StripeProcessor (reqwest)   │  │  orders UNIQUE(session_id) │  │
//! │  │  └── InMemoryProcessor           │  └────────────────────────────┘  │
//! │  └──────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`processor`] - Processor port, session states, settlement decision
//! - [`stripe`] - Stripe Checkout Sessions adapter
//! - [`memory`] - In-memory processor (tests, local development)
//! - [`initiator`] - Session Initiator
//! - [`reconciler`] - Settlement Reconciler
//! - [`qr`] - PromptPay QR token issuer
//! - [`config`] - Checkout settings
//! - [`error`] - `CheckoutError` taxonomy

pub mod config;
pub mod error;
pub mod initiator;
pub mod memory;
pub mod processor;
pub mod qr;
pub mod reconciler;
pub mod stripe;

pub use config::CheckoutSettings;
pub use error::{CheckoutError, CheckoutResult, RejectReason};
pub use initiator::{InitiatedSession, SessionInitiator};
pub use memory::InMemoryProcessor;
pub use processor::{PaymentProcessor, SettlementDecision};
pub use qr::{QrIssuer, QrRequest, QrSettlementToken};
pub use reconciler::{SettlementOutcome, SettlementReconciler};
pub use stripe::{StripeProcessor, StripeSettings};

use std::sync::Arc;
use storefront_db::Database;

/// The three checkout components wired to one processor, database and
/// settings. Cheap to clone.
#[derive(Clone)]
pub struct CheckoutEngine {
    pub initiator: SessionInitiator,
    pub reconciler: SettlementReconciler,
    pub qr: QrIssuer,
    processor_name: &'static str,
}

impl CheckoutEngine {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        db: Database,
        settings: CheckoutSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        CheckoutEngine {
            processor_name: processor.name(),
            initiator: SessionInitiator::new(processor.clone(), settings.clone()),
            reconciler: SettlementReconciler::new(processor, db, settings.clone()),
            qr: QrIssuer::new(settings),
        }
    }

    /// Name of the processor behind the engine, e.g. `"stripe"`.
    pub fn processor_name(&self) -> &'static str {
        self.processor_name
    }
}
