use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use model::{DailySales, NewOrder, NewOrderItem, Order, OrderDetails, OrderFilter, OrderItem};
use serde::Deserialize;
use service::{OrderService, ReportService};
use tracing::info;
use uuid::Uuid;

use super::{ApiResult, Created, StatusChange, created};
use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct QuantityChange {
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub date: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    Ok(Json(state.service.list_orders(filter).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<NewOrder>,
) -> Created<OrderDetails> {
    let details = state.service.create_order(input).await?;
    state.metrics.record_order_created();
    created(details)
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetails> {
    Ok(Json(state.service.get_order(id).await?))
}

pub async fn set_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> ApiResult<Order> {
    let next = body.parse()?;
    Ok(Json(state.service.set_order_status(id, next).await?))
}

pub async fn add_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewOrderItem>,
) -> Created<OrderDetails> {
    created(state.service.add_order_item(id, input).await?)
}

pub async fn get_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderItem> {
    Ok(Json(state.service.get_order_item(id).await?))
}

pub async fn update_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<QuantityChange>,
) -> ApiResult<OrderDetails> {
    Ok(Json(
        state
            .service
            .update_order_item_quantity(id, body.quantity)
            .await?,
    ))
}

pub async fn remove_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetails> {
    Ok(Json(state.service.remove_order_item(id).await?))
}

pub async fn set_order_item_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> ApiResult<OrderItem> {
    let next = body.parse()?;
    Ok(Json(state.service.set_order_item_status(id, next).await?))
}

/// Sales of one day, today (UTC) when no `date` is given.
pub async fn daily_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> ApiResult<DailySales> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| ApiError::BadRequest(format!("invalid date '{raw}': {e}")))?,
        None => Utc::now().date_naive(),
    };
    info!(%date, "Daily sales requested");
    Ok(Json(state.service.daily_sales(date).await?))
}
