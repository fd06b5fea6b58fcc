//! Orders, their line items and status changes.
//!
//! Every item mutation recomputes the order total from the stored items and
//! re-derives the paid flag from the live payment sum inside the same unit of
//! work. The order row is locked before any of its items so concurrent
//! requests touching one order are applied one after the other.

use async_trait::async_trait;
use chrono::Utc;
use domain::{DomainError, Entity, ledger, status, total};
use model::{
    NewOrder, NewOrderItem, Order, OrderDetails, OrderFilter, OrderItem, OrderStatus,
};
use repository::{Store, UnitOfWork};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{RestaurantServiceImpl, ServiceError, required};

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Creates an order with its initial items in one step.
    ///
    /// Every referenced customer, table and dish must exist, every dish must
    /// be available and every quantity at least one. Item prices are copied
    /// from the dishes and the total is computed from them.
    async fn create_order(&self, input: NewOrder) -> Result<OrderDetails, ServiceError>;
    async fn get_order(&self, id: Uuid) -> Result<OrderDetails, ServiceError>;
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, ServiceError>;
    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ServiceError>;

    async fn add_order_item(
        &self,
        order_id: Uuid,
        input: NewOrderItem,
    ) -> Result<OrderDetails, ServiceError>;
    async fn get_order_item(&self, id: Uuid) -> Result<OrderItem, ServiceError>;
    async fn update_order_item_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<OrderDetails, ServiceError>;
    async fn remove_order_item(&self, id: Uuid) -> Result<OrderDetails, ServiceError>;
    /// Changes one item's status. The order's own status is not touched.
    async fn set_order_item_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderItem, ServiceError>;
}

/// Locks an order that still accepts changes.
async fn lock_open_order(
    uow: &mut (dyn UnitOfWork + '_),
    id: Uuid,
) -> Result<Order, ServiceError> {
    let order = required(uow.get_order_for_update(id).await?, Entity::Order, id)?;
    status::ensure_open(&order)?;
    Ok(order)
}

/// Recomputes the total and paid flag of `order` from the stored rows and saves it.
///
/// An order that becomes settled takes the method of its latest payment; one
/// that stops being settled loses its method.
async fn refresh_totals(
    uow: &mut (dyn UnitOfWork + '_),
    order: &mut Order,
) -> Result<(), ServiceError> {
    let items = uow.list_items(order.id).await?;
    let payments = uow.list_payments(Some(order.id)).await?;
    let paid = ledger::total_paid(&payments)?;
    order.total_amount = total::recompute_total(&items)?;

    let was_paid = order.is_paid;
    order.is_paid = ledger::is_settled(order.total_amount, paid);
    if order.is_paid && !was_paid {
        order.payment_method = payments.last().map(|p| p.method.clone());
    } else if !order.is_paid {
        order.payment_method = None;
    }
    order.updated_at = Utc::now();
    uow.update_order(order).await?;
    Ok(())
}

async fn load_details(
    uow: &mut (dyn UnitOfWork + '_),
    order: Order,
) -> Result<OrderDetails, ServiceError> {
    let items = uow.list_items(order.id).await?;
    let payments = uow.list_payments(Some(order.id)).await?;
    let amount_paid = ledger::total_paid(&payments)?;
    Ok(OrderDetails {
        balance_due: ledger::balance_due(order.total_amount, amount_paid),
        order,
        items,
        payments,
        amount_paid,
    })
}

async fn snapshot(
    uow: &mut (dyn UnitOfWork + '_),
    order_id: Uuid,
    input: &NewOrderItem,
) -> Result<OrderItem, ServiceError> {
    total::validate_quantity(input.quantity)?;
    let dish = required(uow.get_dish(input.dish_id).await?, Entity::Dish, input.dish_id)?;
    Ok(total::snapshot_item(order_id, &dish, input)?)
}

#[async_trait]
impl<S: Store> OrderService for RestaurantServiceImpl<S> {
    #[instrument(skip(self, input), fields(items = input.items.len()))]
    async fn create_order(&self, input: NewOrder) -> Result<OrderDetails, ServiceError> {
        for item in &input.items {
            total::validate_quantity(item.quantity)?;
        }

        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        if let Some(id) = input.customer_id {
            required(uow.get_customer(id).await?, Entity::Customer, id)?;
        }
        if let Some(id) = input.table_id {
            required(uow.get_table(id).await?, Entity::Table, id)?;
        }

        let order_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(input.items.len());
        for request in &input.items {
            items.push(snapshot(uow.as_mut(), order_id, request).await?);
        }

        let now = Utc::now();
        let order = Order {
            id: order_id,
            customer_id: input.customer_id,
            table_id: input.table_id,
            waiter_id: input.waiter_id,
            status: OrderStatus::Pending,
            notes: input.notes,
            total_amount: total::recompute_total(&items)?,
            payment_method: None,
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        uow.insert_order(&order).await?;
        for item in &items {
            uow.insert_item(item).await?;
        }
        uow.commit().await?;

        info!(order_id = %order.id, total = %order.total_amount, "Order created");
        Ok(OrderDetails {
            balance_due: order.total_amount,
            order,
            items,
            payments: Vec::new(),
            amount_paid: Decimal::ZERO,
        })
    }

    async fn get_order(&self, id: Uuid) -> Result<OrderDetails, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        let order = required(uow.get_order(id).await?, Entity::Order, id)?;
        load_details(uow.as_mut(), order).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_orders(&filter).await?)
    }

    #[instrument(skip(self))]
    async fn set_order_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut order = required(uow.get_order_for_update(id).await?, Entity::Order, id)?;
        let from = order.status;
        order.status = status::transition(from, next)?;
        order.updated_at = Utc::now();
        uow.update_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %id, %from, to = %order.status, "Order status changed");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn add_order_item(
        &self,
        order_id: Uuid,
        input: NewOrderItem,
    ) -> Result<OrderDetails, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut order = lock_open_order(uow.as_mut(), order_id).await?;
        let item = snapshot(uow.as_mut(), order_id, &input).await?;
        uow.insert_item(&item).await?;
        refresh_totals(uow.as_mut(), &mut order).await?;
        let details = load_details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(%order_id, item_id = %item.id, total = %details.order.total_amount, "Item added");
        Ok(details)
    }

    async fn get_order_item(&self, id: Uuid) -> Result<OrderItem, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_item(id).await?, Entity::OrderItem, id)
    }

    #[instrument(skip(self))]
    async fn update_order_item_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<OrderDetails, ServiceError> {
        total::validate_quantity(quantity)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let order_id = required(uow.get_item(id).await?, Entity::OrderItem, id)?.order_id;
        let mut order = lock_open_order(uow.as_mut(), order_id).await?;
        let mut item = required(uow.get_item_for_update(id).await?, Entity::OrderItem, id)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        uow.update_item(&item).await?;
        refresh_totals(uow.as_mut(), &mut order).await?;
        let details = load_details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(%order_id, item_id = %id, quantity, "Item quantity changed");
        Ok(details)
    }

    #[instrument(skip(self))]
    async fn remove_order_item(&self, id: Uuid) -> Result<OrderDetails, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let order_id = required(uow.get_item(id).await?, Entity::OrderItem, id)?.order_id;
        let mut order = lock_open_order(uow.as_mut(), order_id).await?;
        if !uow.delete_item(id).await? {
            return Err(DomainError::not_found(Entity::OrderItem, id).into());
        }
        refresh_totals(uow.as_mut(), &mut order).await?;
        let details = load_details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(%order_id, item_id = %id, "Item removed");
        Ok(details)
    }

    #[instrument(skip(self))]
    async fn set_order_item_status(
        &self,
        id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderItem, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let order_id = required(uow.get_item(id).await?, Entity::OrderItem, id)?.order_id;
        lock_open_order(uow.as_mut(), order_id).await?;
        let mut item = required(uow.get_item_for_update(id).await?, Entity::OrderItem, id)?;
        let from = item.status;
        item.status = status::transition(from, next)?;
        item.updated_at = Utc::now();
        uow.update_item(&item).await?;
        uow.commit().await?;

        info!(%order_id, item_id = %id, %from, to = %item.status, "Item status changed");
        Ok(item)
    }
}
