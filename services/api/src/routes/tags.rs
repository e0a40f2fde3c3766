//! Tag endpoints; writes are restricted to administrators

use axum::{
    Json, Router,
    extract::{Path, State},
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
    models::{Tag, TagRequest},
    state::AppState,
    validation,
};

const DUPLICATE: &str = "A tag with this name or slug already exists";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route(
            "/tags/:id",
            get(get_tag).patch(update_tag).delete(delete_tag),
        )
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.tag_repository.list().await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tag>> {
    let tag = state
        .tag_repository
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Tag"))?;

    Ok(Json(tag))
}

pub async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<TagRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    let tag = validation::validate_tag(&payload, false)?;

    let created = state
        .tag_repository
        .create(&tag)
        .await?
        .ok_or_else(|| ApiError::BadRequest(DUPLICATE.to_string()))?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<TagRequest>,
) -> ApiResult<Json<Tag>> {
    user.require_admin()?;
    let changes = validation::validate_tag(&payload, true)?;

    let updated = state
        .tag_repository
        .update(id, &changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::BadRequest(DUPLICATE.to_string())
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("Tag"))?;

    Ok(Json(updated))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;

    if !state.tag_repository.delete(id).await? {
        return Err(ApiError::NotFound("Tag"));
    }
    Ok(StatusCode::NO_CONTENT)
}
