use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use model::{Customer, CustomerInput};
use serde::Deserialize;
use service::CustomerService;
use uuid::Uuid;

use super::{ApiResult, Created, created};
use crate::{AppState, error::ApiError};

/// Body of the loyalty endpoint; negative values redeem points.
#[derive(Debug, Deserialize)]
pub struct PointsAdjustment {
    pub delta: i32,
}

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Vec<Customer>> {
    Ok(Json(state.service.list_customers().await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Created<Customer> {
    created(state.service.create_customer(input).await?)
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Customer> {
    Ok(Json(state.service.get_customer(id).await?))
}

pub async fn customer_by_document(
    State(state): State<AppState>,
    Path(document): Path<String>,
) -> ApiResult<Customer> {
    Ok(Json(state.service.customer_by_document(&document).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Customer> {
    Ok(Json(state.service.update_customer(id, input).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn adjust_loyalty_points(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PointsAdjustment>,
) -> ApiResult<Customer> {
    Ok(Json(
        state.service.adjust_loyalty_points(id, body.delta).await?,
    ))
}
