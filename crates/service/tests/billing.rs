mod common;

use std::sync::Arc;

use common::*;
use domain::DomainError;
use domain::money::max_amount;
use model::{NewOrder, OrderStatus};
use rust_decimal::Decimal;
use service::{BillingService, OrderService};
use uuid::Uuid;

#[tokio::test]
async fn test_exact_payment_settles() {
    let svc = service();
    let order = order_of_25(&svc).await.order;

    let receipt = pay(&svc, order.id, money(2500)).await;
    assert!(receipt.settled_now);
    assert!(receipt.order.is_paid);
    assert_eq!(receipt.order.payment_method.as_deref(), Some("cash"));
    assert_eq!(receipt.amount_paid, money(2500));

    let details = svc.get_order(order.id).await.unwrap();
    assert!(details.order.is_paid);
    assert_eq!(details.balance_due, money(0));
    assert_eq!(details.payments.len(), 1);
}

#[tokio::test]
async fn test_partial_payments_settle_on_second() {
    let svc = service();
    let order = order_of_25(&svc).await.order;

    let first = pay(&svc, order.id, money(1000)).await;
    assert!(!first.settled_now);
    assert!(!first.order.is_paid);
    assert_eq!(first.order.payment_method, None);

    let mut second = payment(order.id, money(1500));
    second.method = "card".to_string();
    second.reference = Some("POS-0042".to_string());
    let second = svc.add_payment(second).await.unwrap();
    assert!(second.settled_now);
    assert!(second.order.is_paid);
    assert_eq!(second.order.payment_method.as_deref(), Some("card"));
    assert_eq!(second.amount_paid, money(2500));
}

#[tokio::test]
async fn test_overpayment_is_accepted() {
    let svc = service();
    let order = order_of_25(&svc).await.order;

    let receipt = pay(&svc, order.id, money(4000)).await;
    assert!(receipt.settled_now);

    // later payments do not settle again and keep the settling method
    let mut tip = payment(order.id, money(200));
    tip.method = "card".to_string();
    let tip = svc.add_payment(tip).await.unwrap();
    assert!(!tip.settled_now);
    assert!(tip.order.is_paid);
    assert_eq!(tip.order.payment_method.as_deref(), Some("cash"));
    assert_eq!(tip.amount_paid, money(4200));

    let details = svc.get_order(order.id).await.unwrap();
    assert_eq!(details.balance_due, money(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_half_payments_settle_once() {
    let svc = Arc::new(service());
    let order = order_of_25(&svc).await.order;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { pay(&svc, order.id, money(1250)).await })
        })
        .collect();

    let mut settled_now = 0;
    for task in tasks {
        if task.await.unwrap().settled_now {
            settled_now += 1;
        }
    }
    assert_eq!(settled_now, 1);

    let details = svc.get_order(order.id).await.unwrap();
    assert!(details.order.is_paid);
    assert_eq!(details.amount_paid, money(2500));
}

#[tokio::test]
async fn test_adding_items_after_payment_clears_paid_flag() {
    let svc = service();
    let details = order_of_25(&svc).await;
    let order_id = details.order.id;
    pay(&svc, order_id, money(2500)).await;

    let dessert = dish(&svc, "Suspiro limeño", money(600)).await;
    let grown = svc
        .add_order_item(order_id, line(dessert.id, 1))
        .await
        .unwrap();
    assert!(!grown.order.is_paid);
    assert_eq!(grown.order.payment_method, None);
    assert_eq!(grown.balance_due, money(600));

    let new_item = grown.items.iter().find(|i| i.dish_id == dessert.id).unwrap();
    let shrunk = svc.remove_order_item(new_item.id).await.unwrap();
    assert!(shrunk.order.is_paid);
    assert_eq!(shrunk.order.payment_method.as_deref(), Some("cash"));
}

#[tokio::test]
async fn test_partial_payment_then_shrinking_order_settles() {
    let svc = service();
    let details = order_of_25(&svc).await;
    pay(&svc, details.order.id, money(2000)).await;

    // dropping the 5.00 item brings the total down to what was paid
    let five = details.items.iter().find(|i| i.price == money(500)).unwrap();
    let shrunk = svc.remove_order_item(five.id).await.unwrap();
    assert_eq!(shrunk.order.total_amount, money(2000));
    assert!(shrunk.order.is_paid);
    assert_eq!(shrunk.order.payment_method.as_deref(), Some("cash"));
}

#[tokio::test]
async fn test_removing_every_item_leaves_nothing_due() {
    let svc = service();
    let details = order_of_25(&svc).await;

    let mut last = None;
    for item in &details.items {
        last = Some(svc.remove_order_item(item.id).await.unwrap());
    }
    let emptied = last.unwrap();
    assert_eq!(emptied.order.total_amount, money(0));
    assert!(emptied.order.is_paid);
    assert_eq!(emptied.order.payment_method, None);
    assert_eq!(emptied.balance_due, money(0));
}

#[tokio::test]
async fn test_amounts_must_fit_money_column() {
    let svc = service();
    let order = order_of_25(&svc).await.order;

    let err = svc
        .add_payment(payment(order.id, Decimal::MAX))
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::AmountOverflow));

    let sub_cent = Decimal::new(9995, 3);
    let err = svc
        .add_payment(payment(order.id, sub_cent))
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::InvalidAmount(sub_cent)));

    assert!(svc.list_payments(Some(order.id)).await.unwrap().is_empty());

    // two maximal payments are each storable and sum without overflow
    pay(&svc, order.id, max_amount()).await;
    let receipt = pay(&svc, order.id, max_amount()).await;
    assert_eq!(receipt.amount_paid, max_amount() * Decimal::from(2));
}

#[tokio::test]
async fn test_payment_preconditions() {
    let svc = service();
    let order = order_of_25(&svc).await.order;

    let err = svc
        .add_payment(payment(order.id, money(0)))
        .await
        .unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::InvalidAmount(money(0))));

    let err = svc
        .add_payment(payment(Uuid::new_v4(), money(100)))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));

    svc.set_order_status(order.id, OrderStatus::Canceled)
        .await
        .unwrap();
    let err = svc
        .add_payment(payment(order.id, money(2500)))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&DomainError::OrderTerminal {
            id: order.id,
            status: OrderStatus::Canceled
        })
    );
    assert!(svc.list_payments(Some(order.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delivered_orders_accept_payments() {
    let svc = service();
    let order = order_of_25(&svc).await.order;
    for next in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Delivered] {
        svc.set_order_status(order.id, next).await.unwrap();
    }

    let receipt = pay(&svc, order.id, money(2500)).await;
    assert!(receipt.settled_now);
    assert_eq!(receipt.order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_list_and_get_payments() {
    let svc = service();
    let first = order_of_25(&svc).await.order;
    let second = svc.create_order(NewOrder::default()).await.unwrap().order;

    let p1 = pay(&svc, first.id, money(1000)).await.payment;
    pay(&svc, first.id, money(500)).await;
    pay(&svc, second.id, money(300)).await;

    assert_eq!(svc.list_payments(Some(first.id)).await.unwrap().len(), 2);
    assert_eq!(svc.list_payments(None).await.unwrap().len(), 3);
    assert_eq!(svc.get_payment(p1.id).await.unwrap(), p1);
}
