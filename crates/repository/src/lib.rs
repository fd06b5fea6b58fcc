//! # Data Repository Layer
//!
//! This crate provides the persistence seam of the backend. All reads and
//! writes go through a [`UnitOfWork`]: a single store transaction that either
//! commits every effect or none of them.
//!
//! ```ignore
//! let mut conn = store.connect().await?;
//! let mut uow = conn.begin().await?;
//! let order = uow.get_order_for_update(id).await?;
//! // ...
//! uow.commit().await?;
//! ```
//!
//! Two implementations are available:
//! - [`PgStore`]: PostgreSQL through a deadpool connection pool, with
//!   row-level locks for the `*_for_update` lookups
//! - [`MemoryStore`]: an in-process store that serializes whole
//!   transactions, used by tests and database-less runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    Category, Customer, Dish, DishFilter, Order, OrderFilter, OrderItem, OrderStatus, Payment,
    Table,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// # RepositoryError
///
/// Error types that can occur during repository operations.
///
/// These are infrastructure failures; business rules are checked above this
/// layer. `Conflict` is the store refusing a write because of a uniqueness or
/// reference constraint.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[source] tokio_postgres::Error),
    /// Failed to obtain a connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// A uniqueness or foreign key constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A stored value could not be mapped back onto the model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    /// The unit of work was used after commit.
    #[error("Transaction already finished")]
    TransactionClosed,
}

impl From<tokio_postgres::Error> for RepositoryError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(code)
                if *code == SqlState::UNIQUE_VIOLATION
                    || *code == SqlState::FOREIGN_KEY_VIOLATION =>
            {
                let detail = err
                    .as_db_error()
                    .map(|db| db.message().to_string())
                    .unwrap_or_else(|| err.to_string());
                RepositoryError::Conflict(detail)
            }
            _ => RepositoryError::Db(err),
        }
    }
}

/// # Store
///
/// Entry point of a storage backend. Hands out connections that can open
/// transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>, RepositoryError>;
}

/// A connection able to open one transaction at a time.
#[async_trait]
pub trait Connection: Send {
    async fn begin(&mut self) -> Result<Box<dyn UnitOfWork + '_>, RepositoryError>;
}

/// # UnitOfWork
///
/// One store transaction. Dropping it without calling [`UnitOfWork::commit`]
/// discards every write made through it.
///
/// `*_for_update` lookups lock the returned row until the transaction ends,
/// so a read-decide-write sequence on the same order or customer is
/// serialized while different rows proceed independently. When an operation
/// needs both an order and one of its items, the order is locked first.
#[async_trait]
pub trait UnitOfWork: Send {
    // --- Categories ---
    async fn insert_category(&mut self, category: &Category) -> Result<(), RepositoryError>;
    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, RepositoryError>;
    async fn list_categories(&mut self, only_active: bool)
    -> Result<Vec<Category>, RepositoryError>;
    async fn update_category(&mut self, category: &Category) -> Result<(), RepositoryError>;
    /// Returns false when no row had that id.
    async fn delete_category(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Dishes ---
    async fn insert_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError>;
    async fn get_dish(&mut self, id: Uuid) -> Result<Option<Dish>, RepositoryError>;
    async fn list_dishes(&mut self, filter: &DishFilter) -> Result<Vec<Dish>, RepositoryError>;
    async fn update_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError>;
    async fn delete_dish(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Tables ---
    async fn insert_table(&mut self, table: &Table) -> Result<(), RepositoryError>;
    async fn get_table(&mut self, id: Uuid) -> Result<Option<Table>, RepositoryError>;
    async fn list_tables(&mut self, only_active: bool) -> Result<Vec<Table>, RepositoryError>;
    async fn update_table(&mut self, table: &Table) -> Result<(), RepositoryError>;
    async fn delete_table(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Customers ---
    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn get_customer(&mut self, id: Uuid) -> Result<Option<Customer>, RepositoryError>;
    async fn get_customer_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<Customer>, RepositoryError>;
    async fn get_customer_by_document(
        &mut self,
        document_number: &str,
    ) -> Result<Option<Customer>, RepositoryError>;
    async fn list_customers(&mut self) -> Result<Vec<Customer>, RepositoryError>;
    async fn update_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn delete_customer(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Orders ---
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError>;
    async fn get_order(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError>;
    async fn get_order_for_update(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError>;
    /// Newest first.
    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError>;
    async fn list_orders_with_status(
        &mut self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError>;
    /// Paid orders with `from <= created_at < to`.
    async fn list_paid_orders_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError>;
    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError>;

    // --- Order items ---
    async fn insert_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError>;
    async fn get_item(&mut self, id: Uuid) -> Result<Option<OrderItem>, RepositoryError>;
    async fn get_item_for_update(&mut self, id: Uuid)
    -> Result<Option<OrderItem>, RepositoryError>;
    /// Oldest first.
    async fn list_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError>;
    async fn update_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError>;
    async fn delete_item(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Payments ---
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError>;
    async fn get_payment(&mut self, id: Uuid) -> Result<Option<Payment>, RepositoryError>;
    /// Oldest first; every payment when `order_id` is `None`.
    async fn list_payments(
        &mut self,
        order_id: Option<Uuid>,
    ) -> Result<Vec<Payment>, RepositoryError>;
    async fn sum_payments(&mut self, order_id: Uuid) -> Result<Decimal, RepositoryError>;

    /// Makes every write of this unit of work durable.
    async fn commit(&mut self) -> Result<(), RepositoryError>;
}
