//! # Order Repository
//!
//! Database operations for settled orders and their items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_order(order)                                                    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT INTO orders (... session_id ...)   ← UNIQUE(session_id)       │
//! │    INSERT INTO order_items (position 0)                                 │
//! │    INSERT INTO order_items (position 1) ...                             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A second insert for the same session fails on the header row with     │
//! │  DbError::UniqueViolation and the whole transaction rolls back, so     │
//! │  there is never an order without its items.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::{Order, OrderItem};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    session_id: String,
    currency: String,
    total_minor: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderItemRow {
    product_id: String,
    quantity: i64,
    unit_price_minor: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            session_id: self.session_id,
            currency: self.currency,
            total_minor: self.total_minor,
            created_at: self.created_at,
            items: items
                .into_iter()
                .map(|row| OrderItem {
                    product_id: row.product_id,
                    quantity: row.quantity,
                    unit_price_minor: row.unit_price_minor,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order header and all of its items in one transaction.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation { field: "session_id", .. }` when an order
    ///   for the session already exists
    pub async fn insert_order(&self, order: &Order) -> DbResult<()> {
        debug!(
            order_id = %order.id,
            session_id = %order.session_id,
            total_minor = order.total_minor,
            items = order.items.len(),
            "Inserting order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, session_id, currency, total_minor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.session_id)
        .bind(&order.currency)
        .bind(order.total_minor)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("session_id") => {
                DbError::duplicate("session_id", order.session_id.clone())
            }
            other => other,
        })?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, position, product_id, quantity, unit_price_minor)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(generate_order_item_id())
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_minor)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets an order (with items) by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, session_id, currency, total_minor, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Gets the order settled for a payment session, if any.
    ///
    /// This is the reconciler's idempotency fast path.
    pub async fn get_by_session_id(&self, session_id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, session_id, currency, total_minor, created_at
            FROM orders
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Counts orders for a session. Anything above 1 is a broken invariant.
    pub async fn count_by_session_id(&self, session_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE session_id = ?1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn with_items(&self, row: Option<OrderRow>) -> DbResult<Option<Order>> {
        match row {
            None => Ok(None),
            Some(row) => {
                let items = self.item_rows(&row.id).await?;
                Ok(Some(row.into_order(items)))
            }
        }
    }

    async fn item_rows(&self, order_id: &str) -> DbResult<Vec<OrderItemRow>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT product_id, quantity, unit_price_minor
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Generates a new order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
