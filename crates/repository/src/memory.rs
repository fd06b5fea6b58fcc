//! In-process implementation of the repository traits.
//!
//! A unit of work holds the store-wide lock for its whole lifetime and
//! writes into a private copy of the state, which replaces the shared state
//! on commit. Transactions are therefore fully serialized: any concurrent
//! read-decide-write sequence observes the previous commit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    Category, Customer, Dish, DishFilter, Order, OrderFilter, OrderItem, OrderStatus, Payment,
    Table,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{Connection, RepositoryError, Store, UnitOfWork};

/// Thread-safe in-memory [`Store`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rows of every entity, in insertion order.
#[derive(Debug, Default, Clone)]
struct MemoryState {
    categories: Vec<Category>,
    dishes: Vec<Dish>,
    tables: Vec<Table>,
    customers: Vec<Customer>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    payments: Vec<Payment>,
}

/// Rows addressable by id.
trait Keyed {
    fn key(&self) -> Uuid;
}

macro_rules! keyed {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> Uuid {
                self.id
            }
        })*
    };
}

keyed!(Category, Dish, Table, Customer, Order, OrderItem, Payment);

fn find<T: Keyed + Clone>(rows: &[T], id: Uuid) -> Option<T> {
    rows.iter().find(|r| r.key() == id).cloned()
}

fn replace<T: Keyed + Clone>(rows: &mut [T], row: &T) {
    if let Some(slot) = rows.iter_mut().find(|r| r.key() == row.key()) {
        *slot = row.clone();
    }
}

fn remove<T: Keyed>(rows: &mut Vec<T>, id: Uuid) -> bool {
    let before = rows.len();
    rows.retain(|r| r.key() != id);
    rows.len() != before
}

fn conflict(what: impl Into<String>) -> RepositoryError {
    RepositoryError::Conflict(what.into())
}

#[async_trait]
impl Store for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn Connection>, RepositoryError> {
        Ok(Box::new(MemoryConnection {
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryConnection {
    inner: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn begin(&mut self) -> Result<Box<dyn UnitOfWork + '_>, RepositoryError> {
        let guard = self.inner.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            working,
        }))
    }
}

struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
}

impl MemoryUnitOfWork {
    fn state(&mut self) -> Result<&mut MemoryState, RepositoryError> {
        if self.guard.is_none() {
            return Err(RepositoryError::TransactionClosed);
        }
        Ok(&mut self.working)
    }
}

impl MemoryState {
    fn check_table_number(&self, table: &Table) -> Result<(), RepositoryError> {
        if self
            .tables
            .iter()
            .any(|t| t.number == table.number && t.id != table.id)
        {
            return Err(conflict(format!("table number {} already exists", table.number)));
        }
        Ok(())
    }

    fn check_customer_unique(&self, customer: &Customer) -> Result<(), RepositoryError> {
        for other in self.customers.iter().filter(|c| c.id != customer.id) {
            if other.document_number == customer.document_number {
                return Err(conflict(format!(
                    "document number {} already exists",
                    customer.document_number
                )));
            }
            if other.email == customer.email {
                return Err(conflict(format!("email {} already exists", customer.email)));
            }
        }
        Ok(())
    }

    fn check_dish_category(&self, dish: &Dish) -> Result<(), RepositoryError> {
        match dish.category_id {
            Some(id) if find(&self.categories, id).is_none() => {
                Err(conflict(format!("category {id} does not exist")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    // --- Categories ---

    async fn insert_category(&mut self, category: &Category) -> Result<(), RepositoryError> {
        self.state()?.categories.push(category.clone());
        Ok(())
    }

    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        Ok(find(&self.state()?.categories, id))
    }

    async fn list_categories(
        &mut self,
        only_active: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let mut rows: Vec<Category> = self
            .state()?
            .categories
            .iter()
            .filter(|c| !only_active || c.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_category(&mut self, category: &Category) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.categories, category);
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let state = self.state()?;
        if state.dishes.iter().any(|d| d.category_id == Some(id)) {
            return Err(conflict(format!("category {id} is referenced by dishes")));
        }
        Ok(remove(&mut state.categories, id))
    }

    // --- Dishes ---

    async fn insert_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_dish_category(dish)?;
        state.dishes.push(dish.clone());
        Ok(())
    }

    async fn get_dish(&mut self, id: Uuid) -> Result<Option<Dish>, RepositoryError> {
        Ok(find(&self.state()?.dishes, id))
    }

    async fn list_dishes(&mut self, filter: &DishFilter) -> Result<Vec<Dish>, RepositoryError> {
        let mut rows: Vec<Dish> = self
            .state()?
            .dishes
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_dish_category(dish)?;
        replace(&mut state.dishes, dish);
        Ok(())
    }

    async fn delete_dish(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let state = self.state()?;
        if state.items.iter().any(|i| i.dish_id == id) {
            return Err(conflict(format!("dish {id} is referenced by order items")));
        }
        Ok(remove(&mut state.dishes, id))
    }

    // --- Tables ---

    async fn insert_table(&mut self, table: &Table) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_table_number(table)?;
        state.tables.push(table.clone());
        Ok(())
    }

    async fn get_table(&mut self, id: Uuid) -> Result<Option<Table>, RepositoryError> {
        Ok(find(&self.state()?.tables, id))
    }

    async fn list_tables(&mut self, only_active: bool) -> Result<Vec<Table>, RepositoryError> {
        let mut rows: Vec<Table> = self
            .state()?
            .tables
            .iter()
            .filter(|t| !only_active || t.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.number);
        Ok(rows)
    }

    async fn update_table(&mut self, table: &Table) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_table_number(table)?;
        replace(&mut state.tables, table);
        Ok(())
    }

    async fn delete_table(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let state = self.state()?;
        if state.orders.iter().any(|o| o.table_id == Some(id)) {
            return Err(conflict(format!("table {id} is referenced by orders")));
        }
        Ok(remove(&mut state.tables, id))
    }

    // --- Customers ---

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_customer_unique(customer)?;
        state.customers.push(customer.clone());
        Ok(())
    }

    async fn get_customer(&mut self, id: Uuid) -> Result<Option<Customer>, RepositoryError> {
        Ok(find(&self.state()?.customers, id))
    }

    async fn get_customer_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<Customer>, RepositoryError> {
        // the whole store is already locked
        self.get_customer(id).await
    }

    async fn get_customer_by_document(
        &mut self,
        document_number: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .state()?
            .customers
            .iter()
            .find(|c| c.document_number == document_number)
            .cloned())
    }

    async fn list_customers(&mut self) -> Result<Vec<Customer>, RepositoryError> {
        let mut rows = self.state()?.customers.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError> {
        let state = self.state()?;
        state.check_customer_unique(customer)?;
        replace(&mut state.customers, customer);
        Ok(())
    }

    async fn delete_customer(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let state = self.state()?;
        if state.orders.iter().any(|o| o.customer_id == Some(id)) {
            return Err(conflict(format!("customer {id} is referenced by orders")));
        }
        Ok(remove(&mut state.customers, id))
    }

    // --- Orders ---

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        self.state()?.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(find(&self.state()?.orders, id))
    }

    async fn get_order_for_update(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        self.get_order(id).await
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut rows: Vec<Order> = self
            .state()?
            .orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_orders_with_status(
        &mut self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .state()?
            .orders
            .iter()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect())
    }

    async fn list_paid_orders_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .state()?
            .orders
            .iter()
            .filter(|o| o.is_paid && o.created_at >= from && o.created_at < to)
            .cloned()
            .collect())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.orders, order);
        Ok(())
    }

    // --- Order items ---

    async fn insert_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError> {
        let state = self.state()?;
        if find(&state.orders, item.order_id).is_none() {
            return Err(conflict(format!("order {} does not exist", item.order_id)));
        }
        if find(&state.dishes, item.dish_id).is_none() {
            return Err(conflict(format!("dish {} does not exist", item.dish_id)));
        }
        state.items.push(item.clone());
        Ok(())
    }

    async fn get_item(&mut self, id: Uuid) -> Result<Option<OrderItem>, RepositoryError> {
        Ok(find(&self.state()?.items, id))
    }

    async fn get_item_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<OrderItem>, RepositoryError> {
        self.get_item(id).await
    }

    async fn list_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self
            .state()?
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError> {
        let state = self.state()?;
        if let Some(slot) = state.items.iter_mut().find(|i| i.id == item.id) {
            // price is a snapshot and is never rewritten
            slot.quantity = item.quantity;
            slot.notes = item.notes.clone();
            slot.status = item.status;
            slot.updated_at = item.updated_at;
        }
        Ok(())
    }

    async fn delete_item(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(remove(&mut self.state()?.items, id))
    }

    // --- Payments ---

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError> {
        let state = self.state()?;
        if find(&state.orders, payment.order_id).is_none() {
            return Err(conflict(format!("order {} does not exist", payment.order_id)));
        }
        state.payments.push(payment.clone());
        Ok(())
    }

    async fn get_payment(&mut self, id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        Ok(find(&self.state()?.payments, id))
    }

    async fn list_payments(
        &mut self,
        order_id: Option<Uuid>,
    ) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .state()?
            .payments
            .iter()
            .filter(|p| order_id.is_none_or(|id| p.order_id == id))
            .cloned()
            .collect())
    }

    async fn sum_payments(&mut self, order_id: Uuid) -> Result<Decimal, RepositoryError> {
        Ok(self
            .state()?
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let mut guard = self.guard.take().ok_or(RepositoryError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
