//! User, avatar, password and subscription endpoints

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extract::JsonBody,
    images,
    middleware::{AuthUser, MaybeUser},
    models::{
        AvatarRequest, AvatarResponse, RegisterRequest, SetPasswordRequest, SubscriptionQuery,
        SubscriptionResponse, UserResponse, UserRow,
    },
    pagination::{Page, PageQuery},
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/me", get(me))
        .route("/users/me/avatar", put(set_avatar).delete(delete_avatar))
        .route("/users/set_password", post(set_password))
        .route("/users/subscriptions", get(subscriptions))
        .route("/users/:id", get(get_user))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
}

/// List users
pub async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<UserResponse>>> {
    let page = state.page_request(query.page, query.limit);
    let (users, count) = state.user_repository.list(viewer.id(), page).await?;

    let users = users
        .into_iter()
        .map(|user| user.into_response(&state.media))
        .collect();

    Ok(Json(Page::new(
        users,
        count,
        page,
        state.settings.base_url(),
        &uri,
    )))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_user = validation::validate_registration(&payload)?;

    let user = state
        .user_repository
        .create(&new_user)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("A user with this email or username already exists".to_string())
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_repository
        .find_by_id(id, viewer.id())
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(user.into_response(&state.media)))
}

/// The authenticated user
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<UserResponse>> {
    let me = state
        .user_repository
        .find_by_id(user.id, Some(user.id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(me.into_response(&state.media)))
}

/// Replace the authenticated user's avatar
pub async fn set_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<AvatarRequest>,
) -> ApiResult<Json<AvatarResponse>> {
    let avatar = payload
        .avatar
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::validation("avatar", "This field is required"))?;
    let image = images::decode_data_uri("avatar", avatar, state.settings.max_image_bytes)?;

    let previous = state.user_repository.avatar(user.id).await?;
    let path = state.media.save("avatars", &image).await?;

    if let Err(e) = state.user_repository.set_avatar(user.id, Some(&path)).await {
        state.media.delete(&path).await;
        return Err(e.into());
    }
    if let Some(previous) = previous {
        state.media.delete(&previous).await;
    }

    info!("User {} changed avatar", user.id);
    Ok(Json(AvatarResponse {
        avatar: state.media.url(&path),
    }))
}

/// Remove the authenticated user's avatar
pub async fn delete_avatar(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<StatusCode> {
    let previous = state
        .user_repository
        .avatar(user.id)
        .await?
        .ok_or(ApiError::NotFound("Avatar"))?;

    state.user_repository.set_avatar(user.id, None).await?;
    state.media.delete(&previous).await;

    info!("User {} removed avatar", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Change the authenticated user's password
pub async fn set_password(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    if payload.current_password.is_empty() {
        return Err(ApiError::validation(
            "current_password",
            "This field is required",
        ));
    }
    validation::validate_password("new_password", &payload.new_password)?;

    if !state
        .user_repository
        .verify_password(user.id, &payload.current_password)
        .await?
    {
        return Err(ApiError::validation(
            "current_password",
            "Current password is incorrect",
        ));
    }

    state
        .user_repository
        .update_password(user.id, &payload.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Attach recipe previews and counts to followed users
async fn with_recipes(
    state: &AppState,
    users: Vec<UserRow>,
    recipes_limit: Option<u32>,
) -> ApiResult<Vec<SubscriptionResponse>> {
    let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
    let mut recipes = state
        .recipe_repository
        .short_by_authors(&ids, recipes_limit)
        .await?;
    let counts: HashMap<Uuid, i64> = state.recipe_repository.count_by_authors(&ids).await?;

    Ok(users
        .into_iter()
        .map(|user| {
            let id = user.id;
            SubscriptionResponse {
                user: user.into_response(&state.media),
                recipes: recipes
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|recipe| recipe.into_response(&state.media))
                    .collect(),
                recipes_count: counts.get(&id).copied().unwrap_or(0),
            }
        })
        .collect())
}

/// Users the authenticated user follows
pub async fn subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SubscriptionQuery>,
) -> ApiResult<Json<Page<SubscriptionResponse>>> {
    let page = state.page_request(query.page, query.limit);
    let (users, count) = state.follow_repository.subscriptions(user.id, page).await?;
    let results = with_recipes(&state, users, query.recipes_limit).await?;

    Ok(Json(Page::new(
        results,
        count,
        page,
        state.settings.base_url(),
        &uri,
    )))
}

/// Follow a user
pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SubscriptionQuery>,
) -> ApiResult<impl IntoResponse> {
    if !state.user_repository.exists(id).await? {
        return Err(ApiError::NotFound("User"));
    }
    validation::validate_follow(user.id, id)?;

    if !state.follow_repository.follow(user.id, id).await? {
        return Err(ApiError::BadRequest(
            "You are already subscribed to this user".to_string(),
        ));
    }

    let target = state
        .user_repository
        .find_by_id(id, Some(user.id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let mut response = with_recipes(&state, vec![target], query.recipes_limit).await?;
    let response = response.pop().ok_or(ApiError::NotFound("User"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Unfollow a user
pub async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.user_repository.exists(id).await? {
        return Err(ApiError::NotFound("User"));
    }

    if !state.follow_repository.unfollow(user.id, id).await? {
        return Err(ApiError::BadRequest(
            "You are not subscribed to this user".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
