mod common;

use common::*;
use domain::DomainError;
use domain::money::max_amount;
use model::{NewDish, NewOrder, OrderFilter, OrderStatus};
use rust_decimal::Decimal;
use service::{CatalogService, OrderService, ServiceError};
use uuid::Uuid;

fn domain_err(err: ServiceError) -> DomainError {
    err.as_domain().cloned().expect("expected a domain error")
}

#[tokio::test]
async fn test_create_order_computes_total_from_items() {
    let svc = service();
    let details = order_of_25(&svc).await;

    assert_eq!(details.order.total_amount, money(2500));
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert!(!details.order.is_paid);
    assert_eq!(details.items.len(), 2);
    assert_eq!(details.balance_due, money(2500));
    assert!(details.items.iter().all(|i| i.status == OrderStatus::Pending));
}

#[tokio::test]
async fn test_empty_order_has_zero_total_and_is_not_paid() {
    let svc = service();
    let details = svc.create_order(NewOrder::default()).await.unwrap();
    assert_eq!(details.order.total_amount, money(0));
    assert!(!details.order.is_paid);
}

#[tokio::test]
async fn test_create_order_rejects_bad_items() {
    let svc = service();
    let a = dish(&svc, "Ceviche", money(1800)).await;

    let err = svc
        .create_order(NewOrder {
            items: vec![line(a.id, 0)],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), DomainError::InvalidQuantity(0));

    let missing = Uuid::new_v4();
    let err = svc
        .create_order(NewOrder {
            items: vec![line(a.id, 1), line(missing, 1)],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));

    // nothing was written by the failed attempts
    assert!(svc.list_orders(OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_rejects_unavailable_dish() {
    let svc = service();
    let off = svc
        .create_dish(NewDish {
            name: "Seasonal soup".to_string(),
            price: money(900),
            category_id: None,
            is_available: false,
            is_featured: false,
        })
        .await
        .unwrap();

    let err = svc
        .create_order(NewOrder {
            items: vec![line(off.id, 1)],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), DomainError::DishUnavailable(off.id));
}

#[tokio::test]
async fn test_order_total_must_fit_money_column() {
    let svc = service();
    let err = svc
        .create_dish(NewDish {
            name: "Gold leaf tasting".to_string(),
            price: Decimal::MAX,
            category_id: None,
            is_available: true,
            is_featured: false,
        })
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), DomainError::AmountOverflow);

    let priciest = dish(&svc, "Whole lobster", max_amount()).await;
    let err = svc
        .create_order(NewOrder {
            items: vec![line(priciest.id, 2)],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), DomainError::AmountOverflow);

    let details = svc
        .create_order(NewOrder {
            items: vec![line(priciest.id, 1)],
            ..Default::default()
        })
        .await
        .unwrap();
    let item_id = details.items[0].id;
    let err = svc
        .update_order_item_quantity(item_id, 2)
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), DomainError::AmountOverflow);

    let unchanged = svc.get_order(details.order.id).await.unwrap();
    assert_eq!(unchanged.order.total_amount, max_amount());
    assert_eq!(unchanged.items[0].quantity, 1);
}

#[tokio::test]
async fn test_create_order_requires_existing_table_and_customer() {
    let svc = service();
    let err = svc
        .create_order(NewOrder {
            table_id: Some(Uuid::new_v4()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));

    let err = svc
        .create_order(NewOrder {
            customer_id: Some(Uuid::new_v4()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_total_follows_item_changes() {
    let svc = service();
    let details = order_of_25(&svc).await;
    let order_id = details.order.id;
    let c = dish(&svc, "Pisco sour", money(1250)).await;

    let added = svc.add_order_item(order_id, line(c.id, 2)).await.unwrap();
    assert_eq!(added.order.total_amount, money(5000));
    assert_eq!(added.items.len(), 3);

    let new_item = added.items.iter().find(|i| i.dish_id == c.id).unwrap();
    let changed = svc
        .update_order_item_quantity(new_item.id, 1)
        .await
        .unwrap();
    assert_eq!(changed.order.total_amount, money(3750));

    let removed = svc.remove_order_item(new_item.id).await.unwrap();
    assert_eq!(removed.order.total_amount, money(2500));
    let sum: Decimal = removed.items.iter().filter_map(|i| i.subtotal()).sum();
    assert_eq!(removed.order.total_amount, sum);

    let err = svc.update_order_item_quantity(removed.items[0].id, 0).await.unwrap_err();
    assert_eq!(domain_err(err), DomainError::InvalidQuantity(0));
}

#[tokio::test]
async fn test_item_price_is_fixed_at_creation() {
    let svc = service();
    let a = dish(&svc, "Aji de gallina", money(1000)).await;
    let details = svc
        .create_order(NewOrder {
            items: vec![line(a.id, 1)],
            ..Default::default()
        })
        .await
        .unwrap();

    svc.update_dish(
        a.id,
        NewDish {
            name: a.name.clone(),
            price: money(1400),
            category_id: None,
            is_available: true,
            is_featured: false,
        },
    )
    .await
    .unwrap();

    let item = svc.get_order_item(details.items[0].id).await.unwrap();
    assert_eq!(item.price, money(1000));

    // the requantified total keeps using the snapshot price
    let changed = svc.update_order_item_quantity(item.id, 3).await.unwrap();
    assert_eq!(changed.order.total_amount, money(3000));
}

#[tokio::test]
async fn test_order_status_transitions() {
    let svc = service();
    let id = svc.create_order(NewOrder::default()).await.unwrap().order.id;

    let err = svc
        .set_order_status(id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert_eq!(
        domain_err(err),
        DomainError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Delivered
        }
    );

    let err = svc.set_order_status(id, OrderStatus::Pending).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition { .. }));

    for next in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Delivered] {
        let order = svc.set_order_status(id, next).await.unwrap();
        assert_eq!(order.status, next);
    }

    for next in OrderStatus::ALL {
        assert!(svc.set_order_status(id, next).await.is_err());
    }
}

#[tokio::test]
async fn test_terminal_order_rejects_item_changes() {
    let svc = service();
    let details = order_of_25(&svc).await;
    let id = details.order.id;
    let item_id = details.items[0].id;
    let extra = dish(&svc, "Tres leches", money(700)).await;

    svc.set_order_status(id, OrderStatus::Canceled).await.unwrap();

    let expected = DomainError::OrderTerminal {
        id,
        status: OrderStatus::Canceled,
    };
    let err = svc.add_order_item(id, line(extra.id, 1)).await.unwrap_err();
    assert_eq!(domain_err(err), expected);
    let err = svc.update_order_item_quantity(item_id, 5).await.unwrap_err();
    assert_eq!(domain_err(err), expected);
    let err = svc.remove_order_item(item_id).await.unwrap_err();
    assert_eq!(domain_err(err), expected);
    let err = svc
        .set_order_item_status(item_id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert_eq!(domain_err(err), expected);

    let unchanged = svc.get_order(id).await.unwrap();
    assert_eq!(unchanged.order.total_amount, money(2500));
    assert_eq!(unchanged.items.len(), 2);
}

#[tokio::test]
async fn test_item_status_is_independent_of_order_status() {
    let svc = service();
    let details = order_of_25(&svc).await;
    let item_id = details.items[0].id;

    let item = svc
        .set_order_item_status(item_id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(item.status, OrderStatus::Preparing);

    let err = svc
        .set_order_item_status(item_id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidTransition { .. }));

    let reloaded = svc.get_order(details.order.id).await.unwrap();
    assert_eq!(reloaded.order.status, OrderStatus::Pending);
    assert_eq!(reloaded.items[1].status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_list_orders_filters() {
    let svc = service();
    let t1 = table(&svc, 1, true).await;
    let at_table = svc
        .create_order(NewOrder {
            table_id: Some(t1.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let other = svc.create_order(NewOrder::default()).await.unwrap();
    svc.set_order_status(other.order.id, OrderStatus::Preparing)
        .await
        .unwrap();

    let all = svc.list_orders(OrderFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let by_table = svc
        .list_orders(OrderFilter {
            table_id: Some(t1.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_table.len(), 1);
    assert_eq!(by_table[0].id, at_table.order.id);

    let preparing = svc
        .list_orders(OrderFilter {
            status: Some(OrderStatus::Preparing),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(preparing.len(), 1);
    assert_eq!(preparing[0].id, other.order.id);
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let svc = service();
    let err = svc.get_order(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));
    let err = svc.remove_order_item(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));
    let err = svc
        .set_order_status(Uuid::new_v4(), OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(domain_err(err), DomainError::NotFound { .. }));
}
