use std::fmt;

use model::OrderStatus;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Kinds of records a lookup can fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Dish,
    Table,
    Customer,
    Order,
    OrderItem,
    Payment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Category => "category",
            Entity::Dish => "dish",
            Entity::Table => "table",
            Entity::Customer => "customer",
            Entity::Order => "order",
            Entity::OrderItem => "order item",
            Entity::Payment => "payment",
        })
    }
}

/// Business-rule violations reported to callers as typed failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("unknown status '{0}'")]
    InvalidStatus(String),

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("payment amount must be positive with at most two decimals, got {0}")]
    InvalidAmount(Decimal),

    #[error("price must not be negative and has at most two decimals, got {0}")]
    InvalidPrice(Decimal),

    #[error("amount exceeds the largest storable value 99999999.99")]
    AmountOverflow,

    #[error("dish {0} is not available")]
    DishUnavailable(Uuid),

    #[error("insufficient loyalty points: balance {balance}, adjustment {delta}")]
    InsufficientPoints { balance: i32, delta: i32 },

    #[error("loyalty adjustment {delta} overflows balance {balance}")]
    InvalidPointsDelta { balance: i32, delta: i32 },

    #[error("order {id} is {status} and can no longer be modified")]
    OrderTerminal { id: Uuid, status: OrderStatus },

    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<model::ParseStatusError> for DomainError {
    fn from(err: model::ParseStatusError) -> Self {
        DomainError::InvalidStatus(err.0)
    }
}
