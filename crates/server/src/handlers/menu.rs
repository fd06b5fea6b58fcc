use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use model::{Category, Dish, DishFilter, NewCategory, NewDish};
use service::CatalogService;
use uuid::Uuid;

use super::{ActiveQuery, ApiResult, Created, created};
use crate::{AppState, error::ApiError};

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<Category>> {
    Ok(Json(state.service.list_categories(query.only_active).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<NewCategory>,
) -> Created<Category> {
    created(state.service.create_category(input).await?)
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Category> {
    Ok(Json(state.service.get_category(id).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewCategory>,
) -> ApiResult<Category> {
    Ok(Json(state.service.update_category(id, input).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_dishes(
    State(state): State<AppState>,
    Query(filter): Query<DishFilter>,
) -> ApiResult<Vec<Dish>> {
    Ok(Json(state.service.list_dishes(filter).await?))
}

pub async fn featured_dishes(State(state): State<AppState>) -> ApiResult<Vec<Dish>> {
    Ok(Json(state.service.featured_dishes().await?))
}

pub async fn create_dish(
    State(state): State<AppState>,
    Json(input): Json<NewDish>,
) -> Created<Dish> {
    created(state.service.create_dish(input).await?)
}

pub async fn get_dish(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Dish> {
    Ok(Json(state.service.get_dish(id).await?))
}

pub async fn update_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewDish>,
) -> ApiResult<Dish> {
    Ok(Json(state.service.update_dish(id, input).await?))
}

pub async fn delete_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_dish(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
