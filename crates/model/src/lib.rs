//! Shared data model of the restaurant backend: catalog, tables, customers,
//! orders with their line items, and payments.
//!
//! Types here are plain data. Derived fields (`Order::total_amount`,
//! `Order::is_paid`) are maintained by the `domain` and `service` crates and
//! are never accepted from callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle status shared by orders and order items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    /// Statuses in which an order occupies its table.
    pub const OPEN: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Preparing];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// Delivered and canceled orders accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Whether an order in this status keeps its table busy.
    pub fn holds_table(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Groups dishes on the menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu entry. Its price is copied onto order items when ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dish {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub is_available: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A seat group in the dining room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub id: Uuid,
    pub number: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered guest with a loyalty balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: Uuid,
    pub document_number: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub loyalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The aggregate root of a guest's request and its billing state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub waiter_id: Option<Uuid>,
    pub status: OrderStatus,
    pub notes: String,
    pub total_amount: Decimal,
    pub payment_method: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order with the dish price frozen at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub dish_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub notes: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// `quantity × price`, or `None` if the product does not fit a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// One entry of an order's ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDish {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTable {
    pub number: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Customer fields a caller may write. Loyalty points are absent:
/// they change only through an explicit adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInput {
    pub document_number: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrderItem {
    pub dish_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub table_id: Option<Uuid>,
    #[serde(default)]
    pub waiter_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    #[serde(default)]
    pub reference: Option<String>,
}

// --- Filters ---

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.table_id.is_none_or(|t| order.table_id == Some(t))
            && self.customer_id.is_none_or(|c| order.customer_id == Some(c))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DishFilter {
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
    pub featured: Option<bool>,
}

impl DishFilter {
    pub fn matches(&self, dish: &Dish) -> bool {
        self.category_id.is_none_or(|c| dish.category_id == Some(c))
            && self.available.is_none_or(|a| dish.is_available == a)
            && self.featured.is_none_or(|f| dish.is_featured == f)
    }
}

// --- Views ---

/// An order with its items, its ledger and the amounts derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
}

/// Outcome of recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub order: Order,
    pub amount_paid: Decimal,
    /// True when this payment moved the order from unpaid to paid.
    pub settled_now: bool,
}

/// Paid-order rollup for a single calendar day (UTC).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub order_count: i64,
}

fn default_true() -> bool {
    true
}
