//! Order totals.
//!
//! The total of an order is always `Σ quantity × price` over its current
//! items. Item prices are snapshots taken from the dish when the item is
//! created, so later menu price changes never reach existing orders.
//! A total that would not fit the order's money column is refused with
//! [`DomainError::AmountOverflow`].

use chrono::Utc;
use model::{Dish, NewOrderItem, OrderItem, OrderStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{DomainError, money};

/// Sum of `quantity × price` over `items`. Zero items yield zero.
pub fn recompute_total(items: &[OrderItem]) -> Result<Decimal, DomainError> {
    let subtotals = items
        .iter()
        .map(|item| item.subtotal().ok_or(DomainError::AmountOverflow))
        .collect::<Result<Vec<_>, _>>()?;
    money::ensure_storable(money::checked_sum(subtotals)?)
}

pub fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<(), DomainError> {
    if price < Decimal::ZERO || !money::has_cent_precision(price) {
        return Err(DomainError::InvalidPrice(price));
    }
    money::ensure_storable(price)?;
    Ok(())
}

/// Builds a new line item for `order_id`, freezing the dish's current price.
///
/// # Errors
/// [`DomainError::InvalidQuantity`] for quantities below one and
/// [`DomainError::DishUnavailable`] when the dish is switched off.
pub fn snapshot_item(
    order_id: Uuid,
    dish: &Dish,
    request: &NewOrderItem,
) -> Result<OrderItem, DomainError> {
    validate_quantity(request.quantity)?;
    if !dish.is_available {
        return Err(DomainError::DishUnavailable(dish.id));
    }

    let now = Utc::now();
    Ok(OrderItem {
        id: Uuid::new_v4(),
        order_id,
        dish_id: dish.id,
        quantity: request.quantity,
        price: dish.price,
        notes: request.notes.clone(),
        status: OrderStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}
