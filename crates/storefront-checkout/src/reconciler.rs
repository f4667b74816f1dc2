//! # Settlement Reconciler
//!
//! Paid payment session → exactly one persisted order.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(session_id)                                                  │
//! │    │                                                                    │
//! │    ├── orders.get_by_session_id ──── found ──► Settled (already)        │
//! │    │                                                                    │
//! │    ├── processor.retrieve_session ── unknown ─► SessionNotFound         │
//! │    │                                                                    │
//! │    ├── SettlementDecision::classify                                     │
//! │    │     ├── Pending  ──────────────────────► Pending (nothing written) │
//! │    │     ├── Reject   ──────────────────────► SettlementRejected        │
//! │    │     └── Settle                                                     │
//! │    │                                                                    │
//! │    ├── SessionSnapshot::from_metadata ─ bad ─► CorruptMetadata          │
//! │    ├── lines: settlement_unit_price(price, rate)                        │
//! │    ├── total: processor amount_total (never Σ lines)                    │
//! │    │                                                                    │
//! │    └── orders.insert_order                                              │
//! │          ├── ok ─────────────────────────────► Settled                  │
//! │          ├── UNIQUE(session_id) ── re-read ──► Settled (already)        │
//! │          └── other ──────────────────────────► PartialSettlement (ERROR)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use storefront_core::currency::settlement_unit_price;
use storefront_core::validation::validate_session_id;
use storefront_core::{generate_order_id, CoreError, Order, OrderItem, SessionSnapshot};
use storefront_db::{Database, DbError};

use crate::config::CheckoutSettings;
use crate::error::{CheckoutError, CheckoutResult};
use crate::processor::{PaymentProcessor, RetrievedSession, SettlementDecision};

/// What happened to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// An order exists for the session.
    Settled {
        order_id: String,
        /// True when the order was written by an earlier call.
        already_settled: bool,
    },
    /// The session is not paid yet. Nothing was written.
    Pending { session_id: String },
}

/// Turns paid sessions into orders.
#[derive(Clone)]
pub struct SettlementReconciler {
    processor: Arc<dyn PaymentProcessor>,
    db: Database,
    settings: Arc<CheckoutSettings>,
}

impl SettlementReconciler {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        db: Database,
        settings: Arc<CheckoutSettings>,
    ) -> Self {
        SettlementReconciler {
            processor,
            db,
            settings,
        }
    }

    /// Reconciles one session. Safe to call any number of times.
    pub async fn reconcile(&self, session_id: &str) -> CheckoutResult<SettlementOutcome> {
        validate_session_id(session_id)
            .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;

        if let Some(existing) = self.db.orders().get_by_session_id(session_id).await? {
            info!(
                session_id = %session_id,
                order_id = %existing.id,
                "Session already settled"
            );
            return Ok(SettlementOutcome::Settled {
                order_id: existing.id,
                already_settled: true,
            });
        }

        let session = self.processor.retrieve_session(session_id).await?;

        match SettlementDecision::classify(&session) {
            SettlementDecision::Settle => self.settle(session_id, &session).await,
            SettlementDecision::Pending => {
                info!(
                    session_id = %session_id,
                    status = ?session.status,
                    payment_status = ?session.payment_status,
                    "Session not paid yet"
                );
                Ok(SettlementOutcome::Pending {
                    session_id: session_id.to_string(),
                })
            }
            SettlementDecision::Reject(reason) => {
                warn!(
                    session_id = %session_id,
                    reason = %reason,
                    "Settlement rejected"
                );
                Err(CheckoutError::SettlementRejected {
                    session_id: session_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Builds the order for a paid session from its snapshot.
    pub fn build_order(
        &self,
        session_id: &str,
        session: &RetrievedSession,
    ) -> CheckoutResult<Order> {
        let corrupt = |reason: String| CheckoutError::CorruptMetadata {
            session_id: session_id.to_string(),
            reason,
        };

        let snapshot = SessionSnapshot::from_metadata(&session.metadata).map_err(|e| match e {
            CoreError::CorruptSnapshot(reason) => corrupt(reason),
            other => corrupt(other.to_string()),
        })?;

        let total = session.amount_total.ok_or_else(|| {
            CheckoutError::Processor(format!("paid session {} has no amount_total", session_id))
        })?;

        let mut items = Vec::with_capacity(snapshot.lines.len());
        for line in &snapshot.lines {
            let unit = settlement_unit_price(line.price, self.settings.settlement_rate)
                .map_err(|e| corrupt(e.to_string()))?;
            items.push(OrderItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_minor: unit.minor(),
            });
        }

        Ok(Order {
            id: generate_order_id(),
            user_id: snapshot.user_id,
            session_id: session_id.to_string(),
            currency: self.settings.settlement_currency.code().to_string(),
            total_minor: total.minor(),
            created_at: Utc::now(),
            items,
        })
    }

    async fn settle(
        &self,
        session_id: &str,
        session: &RetrievedSession,
    ) -> CheckoutResult<SettlementOutcome> {
        let order = match self.build_order(session_id, session) {
            Ok(order) => order,
            Err(err) => {
                error!(
                    session_id = %session_id,
                    error = %err,
                    "Paid session cannot be turned into an order"
                );
                return Err(err);
            }
        };

        match self.db.orders().insert_order(&order).await {
            Ok(()) => {
                info!(
                    session_id = %session_id,
                    order_id = %order.id,
                    user_id = %order.user_id,
                    total_minor = order.total_minor,
                    "Order settled"
                );
                Ok(SettlementOutcome::Settled {
                    order_id: order.id,
                    already_settled: false,
                })
            }
            Err(DbError::UniqueViolation { .. }) => self.resolve_race(session_id).await,
            Err(err) => Err(self.partial_settlement(session_id, err.to_string())),
        }
    }

    /// A concurrent call won the insert; hand back its order.
    async fn resolve_race(&self, session_id: &str) -> CheckoutResult<SettlementOutcome> {
        match self.db.orders().get_by_session_id(session_id).await {
            Ok(Some(existing)) => {
                info!(
                    session_id = %session_id,
                    order_id = %existing.id,
                    "Concurrent settlement resolved to existing order"
                );
                Ok(SettlementOutcome::Settled {
                    order_id: existing.id,
                    already_settled: true,
                })
            }
            Ok(None) => Err(self.partial_settlement(
                session_id,
                "unique violation but no order found".to_string(),
            )),
            Err(err) => Err(self.partial_settlement(session_id, err.to_string())),
        }
    }

    fn partial_settlement(&self, session_id: &str, reason: String) -> CheckoutError {
        error!(
            alert = "partial_settlement",
            session_id = %session_id,
            reason = %reason,
            "Payment captured but order was not recorded"
        );
        CheckoutError::PartialSettlement {
            session_id: session_id.to_string(),
            reason,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
