#![allow(dead_code)]

use model::{Dish, NewDish, NewOrder, NewOrderItem, NewPayment, NewTable, OrderDetails, Table};
use repository::MemoryStore;
use rust_decimal::Decimal;
use service::{BillingService, CatalogService, OrderService, RestaurantServiceImpl, TableService};
use uuid::Uuid;

pub type TestService = RestaurantServiceImpl<MemoryStore>;

pub fn service() -> TestService {
    RestaurantServiceImpl::new(MemoryStore::new())
}

/// Amount with two decimal places, e.g. `money(1050)` is 10.50.
pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub async fn dish(svc: &TestService, name: &str, price: Decimal) -> Dish {
    svc.create_dish(NewDish {
        name: name.to_string(),
        price,
        category_id: None,
        is_available: true,
        is_featured: false,
    })
    .await
    .unwrap()
}

pub async fn table(svc: &TestService, number: i32, is_active: bool) -> Table {
    svc.create_table(NewTable { number, is_active }).await.unwrap()
}

pub fn line(dish_id: Uuid, quantity: i32) -> NewOrderItem {
    NewOrderItem {
        dish_id,
        quantity,
        notes: String::new(),
    }
}

/// Dish A 10.00 x2 plus dish B 5.00 x1, totalling 25.00.
pub async fn order_of_25(svc: &TestService) -> OrderDetails {
    let a = dish(svc, "Lomo saltado", money(1000)).await;
    let b = dish(svc, "Chicha morada", money(500)).await;
    svc.create_order(NewOrder {
        items: vec![line(a.id, 2), line(b.id, 1)],
        ..Default::default()
    })
    .await
    .unwrap()
}

pub fn payment(order_id: Uuid, amount: Decimal) -> NewPayment {
    NewPayment {
        order_id,
        amount,
        method: "cash".to_string(),
        reference: None,
    }
}

pub async fn pay(svc: &TestService, order_id: Uuid, amount: Decimal) -> model::PaymentReceipt {
    svc.add_payment(payment(order_id, amount)).await.unwrap()
}
