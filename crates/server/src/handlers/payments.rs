use axum::{
    Json,
    extract::{Path, Query, State},
};
use model::{NewPayment, Payment, PaymentReceipt};
use serde::Deserialize;
use service::BillingService;
use uuid::Uuid;

use super::{ApiResult, Created, created};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub order_id: Option<Uuid>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Vec<Payment>> {
    Ok(Json(state.service.list_payments(query.order_id).await?))
}

pub async fn add_payment(
    State(state): State<AppState>,
    Json(input): Json<NewPayment>,
) -> Created<PaymentReceipt> {
    let receipt = state.service.add_payment(input).await?;
    state.metrics.record_payment(receipt.settled_now);
    created(receipt)
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Payment> {
    Ok(Json(state.service.get_payment(id).await?))
}
