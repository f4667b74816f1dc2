//! # Repository Module
//!
//! Database repository implementations for the order store.
//!
//! ```text
//! Handler / Reconciler
//!      │  db.orders().get_by_session_id("cs_...")
//!      ▼
//! OrderRepository
//! ├── insert_order(&self, order)        (transaction)
//! ├── get_by_id(&self, id)             (with items)
//! ├── get_by_session_id(&self, session_id)
//! └── count_by_session_id(&self, session_id)
//!      │  SQL
//!      ▼
//! SQLite (orders, order_items)
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Settled orders and their items

pub mod order;
