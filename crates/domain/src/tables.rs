//! Table availability.

use std::collections::HashSet;

use model::{Order, Table};
use uuid::Uuid;

/// Tables referenced by an order that still holds its table (pending or preparing).
pub fn busy_table_ids(orders: &[Order]) -> HashSet<Uuid> {
    orders
        .iter()
        .filter(|o| o.status.holds_table())
        .filter_map(|o| o.table_id)
        .collect()
}

/// Active tables not held by any open order, in the order given.
///
/// Computed from scratch on every call; order statuses change continuously.
pub fn available_tables(tables: &[Table], orders: &[Order]) -> Vec<Table> {
    let busy = busy_table_ids(orders);
    tables
        .iter()
        .filter(|t| t.is_active && !busy.contains(&t.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::OrderStatus;
    use rust_decimal::Decimal;

    fn table(number: i32, active: bool) -> Table {
        let now = Utc::now();
        Table {
            id: Uuid::new_v4(),
            number,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn order_on(table: &Table, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            table_id: Some(table.id),
            waiter_id: None,
            status,
            notes: String::new(),
            total_amount: Decimal::ZERO,
            payment_method: None,
            is_paid: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn numbers(tables: &[Table]) -> Vec<i32> {
        tables.iter().map(|t| t.number).collect()
    }

    #[test]
    fn test_preparing_order_holds_its_table() {
        let tables = vec![table(1, true), table(2, true), table(3, false)];
        let orders = vec![order_on(&tables[0], OrderStatus::Preparing)];
        assert_eq!(numbers(&available_tables(&tables, &orders)), vec![2]);
    }

    #[test]
    fn test_finished_orders_release_tables() {
        let tables = vec![table(1, true), table(2, true), table(3, true)];
        let orders = vec![
            order_on(&tables[0], OrderStatus::Ready),
            order_on(&tables[1], OrderStatus::Delivered),
            order_on(&tables[2], OrderStatus::Canceled),
        ];
        assert_eq!(numbers(&available_tables(&tables, &orders)), vec![1, 2, 3]);
    }

    #[test]
    fn test_inactive_tables_are_never_available() {
        let tables = vec![table(7, false)];
        assert!(available_tables(&tables, &[]).is_empty());
    }

    #[test]
    fn test_orders_without_table_are_ignored() {
        let t = table(1, true);
        let mut takeaway = order_on(&t, OrderStatus::Pending);
        takeaway.table_id = None;
        assert!(busy_table_ids(&[takeaway]).is_empty());
    }
}
