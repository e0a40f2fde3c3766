//! Ingredient endpoints; writes are restricted to administrators

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use common::error::is_unique_violation;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extract::JsonBody,
    middleware::AuthUser,
    models::{Ingredient, IngredientQuery, IngredientRequest},
    state::AppState,
    validation,
};

const DUPLICATE: &str = "This ingredient already exists with the same measurement unit";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            get(get_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
}

/// Search ingredients by name prefix
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let ingredients = state
        .ingredient_repository
        .search(query.name.as_deref())
        .await?;

    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Ingredient>> {
    let ingredient = state
        .ingredient_repository
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Ingredient"))?;

    Ok(Json(ingredient))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<IngredientRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    let ingredient = validation::validate_ingredient(&payload, false)?;

    let created = state
        .ingredient_repository
        .create(&ingredient)
        .await?
        .ok_or_else(|| ApiError::BadRequest(DUPLICATE.to_string()))?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<IngredientRequest>,
) -> ApiResult<Json<Ingredient>> {
    user.require_admin()?;
    let changes = validation::validate_ingredient(&payload, true)?;

    let updated = state
        .ingredient_repository
        .update(id, &changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::BadRequest(DUPLICATE.to_string())
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("Ingredient"))?;

    Ok(Json(updated))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;

    if !state.ingredient_repository.delete(id).await? {
        return Err(ApiError::NotFound("Ingredient"));
    }
    Ok(StatusCode::NO_CONTENT)
}
