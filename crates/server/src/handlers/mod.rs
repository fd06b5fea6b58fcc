//! JSON handlers, one module per resource.

use axum::Json;
use axum::http::StatusCode;
use model::OrderStatus;
use serde::Deserialize;

use crate::error::ApiError;

pub mod customers;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod tables;

pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

/// `?only_active=true` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    #[serde(default)]
    pub only_active: bool,
}

/// Body of the status endpoints, e.g. `{ "status": "preparing" }`.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

impl StatusChange {
    pub fn parse(&self) -> Result<OrderStatus, ApiError> {
        self.status
            .parse::<OrderStatus>()
            .map_err(|e| domain::DomainError::from(e).into())
    }
}

pub fn created<T>(body: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(body)))
}
