use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use model::{NewTable, Table};
use service::TableService;
use uuid::Uuid;

use super::{ActiveQuery, ApiResult, Created, created};
use crate::{AppState, error::ApiError};

pub async fn list_tables(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<Table>> {
    Ok(Json(state.service.list_tables(query.only_active).await?))
}

pub async fn available_tables(State(state): State<AppState>) -> ApiResult<Vec<Table>> {
    Ok(Json(state.service.available_tables().await?))
}

pub async fn create_table(
    State(state): State<AppState>,
    Json(input): Json<NewTable>,
) -> Created<Table> {
    created(state.service.create_table(input).await?)
}

pub async fn get_table(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Table> {
    Ok(Json(state.service.get_table(id).await?))
}

pub async fn update_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewTable>,
) -> ApiResult<Table> {
    Ok(Json(state.service.update_table(id, input).await?))
}

pub async fn delete_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_table(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
