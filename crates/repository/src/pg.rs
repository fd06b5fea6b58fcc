//! PostgreSQL implementation of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Object, Pool, Transaction};
use model::{
    Category, Customer, Dish, DishFilter, Order, OrderFilter, OrderItem, OrderStatus, Payment,
    Table,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

use crate::{Connection, RepositoryError, Store, UnitOfWork};

const CATEGORY_COLUMNS: &str = "id, name, is_active, created_at, updated_at";
const DISH_COLUMNS: &str =
    "id, name, price, category_id, is_available, is_featured, created_at, updated_at";
const TABLE_COLUMNS: &str = "id, number, is_active, created_at, updated_at";
const CUSTOMER_COLUMNS: &str = "id, document_number, name, email, phone, address, \
     loyalty_points, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, customer_id, table_id, waiter_id, status, notes, \
     total_amount, payment_method, is_paid, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, order_id, dish_id, quantity, price, notes, status, created_at, updated_at";
const PAYMENT_COLUMNS: &str = "id, order_id, amount, method, reference, created_at";

/// PostgreSQL-backed [`Store`] over a deadpool connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn connect(&self) -> Result<Box<dyn Connection>, RepositoryError> {
        let client = self.pool.get().await?;
        Ok(Box::new(PgConnection { client }))
    }
}

struct PgConnection {
    client: Object,
}

#[async_trait]
impl Connection for PgConnection {
    async fn begin(&mut self) -> Result<Box<dyn UnitOfWork + '_>, RepositoryError> {
        let tx = self.client.transaction().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// A PostgreSQL transaction. Rolled back on drop unless committed.
struct PgUnitOfWork<'a> {
    tx: Option<Transaction<'a>>,
}

impl<'a> PgUnitOfWork<'a> {
    fn tx(&self) -> Result<&Transaction<'a>, RepositoryError> {
        self.tx.as_ref().ok_or(RepositoryError::TransactionClosed)
    }

    async fn fetch_opt<T>(
        &self,
        sql: &str,
        id: Uuid,
        map: fn(&Row) -> Result<T, RepositoryError>,
    ) -> Result<Option<T>, RepositoryError> {
        let row = self.tx()?.query_opt(sql, &[&id]).await?;
        row.as_ref().map(map).transpose()
    }

    async fn delete_by_id(&self, table: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let affected = self.tx()?.execute(sql.as_str(), &[&id]).await?;
        Ok(affected > 0)
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse()
        .map_err(|e: model::ParseStatusError| RepositoryError::Corrupt(e.to_string()))
}

fn category_from_row(row: &Row) -> Result<Category, RepositoryError> {
    Ok(Category {
        id: row.get("id"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn dish_from_row(row: &Row) -> Result<Dish, RepositoryError> {
    Ok(Dish {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        category_id: row.get("category_id"),
        is_available: row.get("is_available"),
        is_featured: row.get("is_featured"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn table_from_row(row: &Row) -> Result<Table, RepositoryError> {
    Ok(Table {
        id: row.get("id"),
        number: row.get("number"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn customer_from_row(row: &Row) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: row.get("id"),
        document_number: row.get("document_number"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address: row.get("address"),
        loyalty_points: row.get("loyalty_points"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn order_from_row(row: &Row) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        table_id: row.get("table_id"),
        waiter_id: row.get("waiter_id"),
        status: parse_status(row.get("status"))?,
        notes: row.get("notes"),
        total_amount: row.get("total_amount"),
        payment_method: row.get("payment_method"),
        is_paid: row.get("is_paid"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn item_from_row(row: &Row) -> Result<OrderItem, RepositoryError> {
    Ok(OrderItem {
        id: row.get("id"),
        order_id: row.get("order_id"),
        dish_id: row.get("dish_id"),
        quantity: row.get("quantity"),
        price: row.get("price"),
        notes: row.get("notes"),
        status: parse_status(row.get("status"))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn payment_from_row(row: &Row) -> Result<Payment, RepositoryError> {
    Ok(Payment {
        id: row.get("id"),
        order_id: row.get("order_id"),
        amount: row.get("amount"),
        method: row.get("method"),
        reference: row.get("reference"),
        created_at: row.get("created_at"),
    })
}

fn map_rows<T>(
    rows: Vec<Row>,
    map: fn(&Row) -> Result<T, RepositoryError>,
) -> Result<Vec<T>, RepositoryError> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl<'a> UnitOfWork for PgUnitOfWork<'a> {
    // --- Categories ---

    async fn insert_category(&mut self, category: &Category) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO categories (id, name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;
        self.tx()?
            .execute(query, &[
                &category.id,
                &category.name,
                &category.is_active,
                &category.created_at,
                &category.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        self.fetch_opt(&sql, id, category_from_row).await
    }

    async fn list_categories(
        &mut self,
        only_active: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE (NOT $1 OR is_active) ORDER BY name"
        );
        let rows = self.tx()?.query(sql.as_str(), &[&only_active]).await?;
        map_rows(rows, category_from_row)
    }

    async fn update_category(&mut self, category: &Category) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE categories SET name = $2, is_active = $3, updated_at = $4
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &category.id,
                &category.name,
                &category.is_active,
                &category.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_by_id("categories", id).await
    }

    // --- Dishes ---

    async fn insert_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO dishes (id, name, price, category_id, is_available, is_featured, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;
        self.tx()?
            .execute(query, &[
                &dish.id,
                &dish.name,
                &dish.price,
                &dish.category_id,
                &dish.is_available,
                &dish.is_featured,
                &dish.created_at,
                &dish.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_dish(&mut self, id: Uuid) -> Result<Option<Dish>, RepositoryError> {
        let sql = format!("SELECT {DISH_COLUMNS} FROM dishes WHERE id = $1");
        self.fetch_opt(&sql, id, dish_from_row).await
    }

    async fn list_dishes(&mut self, filter: &DishFilter) -> Result<Vec<Dish>, RepositoryError> {
        let sql = format!(
            "SELECT {DISH_COLUMNS} FROM dishes \
             WHERE ($1::uuid IS NULL OR category_id = $1) \
               AND ($2::bool IS NULL OR is_available = $2) \
               AND ($3::bool IS NULL OR is_featured = $3) \
             ORDER BY name"
        );
        let rows = self
            .tx()?
            .query(sql.as_str(), &[
                &filter.category_id,
                &filter.available,
                &filter.featured,
            ])
            .await?;
        map_rows(rows, dish_from_row)
    }

    async fn update_dish(&mut self, dish: &Dish) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE dishes
            SET name = $2, price = $3, category_id = $4, is_available = $5, is_featured = $6, updated_at = $7
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &dish.id,
                &dish.name,
                &dish.price,
                &dish.category_id,
                &dish.is_available,
                &dish.is_featured,
                &dish.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn delete_dish(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_by_id("dishes", id).await
    }

    // --- Tables ---

    async fn insert_table(&mut self, table: &Table) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO restaurant_tables (id, number, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;
        self.tx()?
            .execute(query, &[
                &table.id,
                &table.number,
                &table.is_active,
                &table.created_at,
                &table.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_table(&mut self, id: Uuid) -> Result<Option<Table>, RepositoryError> {
        let sql = format!("SELECT {TABLE_COLUMNS} FROM restaurant_tables WHERE id = $1");
        self.fetch_opt(&sql, id, table_from_row).await
    }

    async fn list_tables(&mut self, only_active: bool) -> Result<Vec<Table>, RepositoryError> {
        let sql = format!(
            "SELECT {TABLE_COLUMNS} FROM restaurant_tables \
             WHERE (NOT $1 OR is_active) ORDER BY number"
        );
        let rows = self.tx()?.query(sql.as_str(), &[&only_active]).await?;
        map_rows(rows, table_from_row)
    }

    async fn update_table(&mut self, table: &Table) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE restaurant_tables SET number = $2, is_active = $3, updated_at = $4
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &table.id,
                &table.number,
                &table.is_active,
                &table.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn delete_table(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_by_id("restaurant_tables", id).await
    }

    // --- Customers ---

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO customers (
                id, document_number, name, email, phone, address,
                loyalty_points, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;
        self.tx()?
            .execute(query, &[
                &customer.id,
                &customer.document_number,
                &customer.name,
                &customer.email,
                &customer.phone,
                &customer.address,
                &customer.loyalty_points,
                &customer.created_at,
                &customer.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_customer(&mut self, id: Uuid) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        self.fetch_opt(&sql, id, customer_from_row).await
    }

    async fn get_customer_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 FOR UPDATE");
        self.fetch_opt(&sql, id, customer_from_row).await
    }

    async fn get_customer_by_document(
        &mut self,
        document_number: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE document_number = $1");
        let row = self.tx()?.query_opt(sql.as_str(), &[&document_number]).await?;
        row.as_ref().map(customer_from_row).transpose()
    }

    async fn list_customers(&mut self) -> Result<Vec<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name");
        let rows = self.tx()?.query(sql.as_str(), &[]).await?;
        map_rows(rows, customer_from_row)
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE customers
            SET document_number = $2, name = $3, email = $4, phone = $5, address = $6,
                loyalty_points = $7, updated_at = $8
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &customer.id,
                &customer.document_number,
                &customer.name,
                &customer.email,
                &customer.phone,
                &customer.address,
                &customer.loyalty_points,
                &customer.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn delete_customer(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_by_id("customers", id).await
    }

    // --- Orders ---

    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO orders (
                id, customer_id, table_id, waiter_id, status, notes,
                total_amount, payment_method, is_paid, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        "#;
        self.tx()?
            .execute(query, &[
                &order.id,
                &order.customer_id,
                &order.table_id,
                &order.waiter_id,
                &order.status.as_str(),
                &order.notes,
                &order.total_amount,
                &order.payment_method,
                &order.is_paid,
                &order.created_at,
                &order.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_order(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        self.fetch_opt(&sql, id, order_from_row).await
    }

    async fn get_order_for_update(&mut self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        debug!(order_id = %id, "Locking order row");
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        self.fetch_opt(&sql, id, order_from_row).await
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR table_id = $2) \
               AND ($3::uuid IS NULL OR customer_id = $3) \
             ORDER BY created_at DESC"
        );
        let status = filter.status.map(|s| s.as_str());
        let rows = self
            .tx()?
            .query(sql.as_str(), &[&status, &filter.table_id, &filter.customer_id])
            .await?;
        map_rows(rows, order_from_row)
    }

    async fn list_orders_with_status(
        &mut self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ANY($1) ORDER BY created_at DESC"
        );
        let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows = self.tx()?.query(sql.as_str(), &[&names]).await?;
        map_rows(rows, order_from_row)
    }

    async fn list_paid_orders_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE is_paid AND created_at >= $1 AND created_at < $2 \
             ORDER BY created_at"
        );
        let rows = self.tx()?.query(sql.as_str(), &[&from, &to]).await?;
        map_rows(rows, order_from_row)
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET customer_id = $2, table_id = $3, waiter_id = $4, status = $5, notes = $6,
                total_amount = $7, payment_method = $8, is_paid = $9, updated_at = $10
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &order.id,
                &order.customer_id,
                &order.table_id,
                &order.waiter_id,
                &order.status.as_str(),
                &order.notes,
                &order.total_amount,
                &order.payment_method,
                &order.is_paid,
                &order.updated_at,
            ])
            .await?;
        Ok(())
    }

    // --- Order items ---

    async fn insert_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO order_items (id, order_id, dish_id, quantity, price, notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;
        self.tx()?
            .execute(query, &[
                &item.id,
                &item.order_id,
                &item.dish_id,
                &item.quantity,
                &item.price,
                &item.notes,
                &item.status.as_str(),
                &item.created_at,
                &item.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_item(&mut self, id: Uuid) -> Result<Option<OrderItem>, RepositoryError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1");
        self.fetch_opt(&sql, id, item_from_row).await
    }

    async fn get_item_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<OrderItem>, RepositoryError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1 FOR UPDATE");
        self.fetch_opt(&sql, id, item_from_row).await
    }

    async fn list_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at, id"
        );
        let rows = self.tx()?.query(sql.as_str(), &[&order_id]).await?;
        map_rows(rows, item_from_row)
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<(), RepositoryError> {
        // price is a snapshot and is never rewritten
        let query = r#"
            UPDATE order_items SET quantity = $2, notes = $3, status = $4, updated_at = $5
            WHERE id = $1
        "#;
        self.tx()?
            .execute(query, &[
                &item.id,
                &item.quantity,
                &item.notes,
                &item.status.as_str(),
                &item.updated_at,
            ])
            .await?;
        Ok(())
    }

    async fn delete_item(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_by_id("order_items", id).await
    }

    // --- Payments ---

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO payments (id, order_id, amount, method, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;
        self.tx()?
            .execute(query, &[
                &payment.id,
                &payment.order_id,
                &payment.amount,
                &payment.method,
                &payment.reference,
                &payment.created_at,
            ])
            .await?;
        Ok(())
    }

    async fn get_payment(&mut self, id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        self.fetch_opt(&sql, id, payment_from_row).await
    }

    async fn list_payments(
        &mut self,
        order_id: Option<Uuid>,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE ($1::uuid IS NULL OR order_id = $1) ORDER BY created_at, id"
        );
        let rows = self.tx()?.query(sql.as_str(), &[&order_id]).await?;
        map_rows(rows, payment_from_row)
    }

    async fn sum_payments(&mut self, order_id: Uuid) -> Result<Decimal, RepositoryError> {
        let query = "SELECT COALESCE(SUM(amount), 0) AS paid FROM payments WHERE order_id = $1";
        let row = self.tx()?.query_one(query, &[&order_id]).await?;
        Ok(row.get("paid"))
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let tx = self.tx.take().ok_or(RepositoryError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}
