//! Recipe endpoints, favorites, shopping cart and short links

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extract::JsonBody,
    middleware::{AuthUser, MaybeUser},
    models::{IngredientAmount, RecipeQuery, RecipeRequest, RecipeResponse, RecipeRow, ShortRecipe},
    pagination::Page,
    repositories::RecipeList,
    shopping_list,
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/get-link", get(get_link))
        .route(
            "/recipes/:id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

/// Encode a recipe id as a short link code
pub fn short_code(id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decode a short link code back into a recipe id
pub fn decode_short_code(code: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(code).ok()?;
    Uuid::from_slice(&bytes).ok()
}

/// Attach tags and ingredients to recipe rows
async fn to_responses(state: &AppState, rows: Vec<RecipeRow>) -> ApiResult<Vec<RecipeResponse>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut relations = state.recipe_repository.relations(&ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let (tags, ingredients) = relations.take(row.id);
            RecipeResponse::new(row, tags, ingredients, &state.media)
        })
        .collect())
}

async fn load_response(state: &AppState, id: Uuid, viewer: Option<Uuid>) -> ApiResult<RecipeResponse> {
    let row = state
        .recipe_repository
        .find_by_id(id, viewer)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;

    to_responses(state, vec![row])
        .await?
        .pop()
        .ok_or(ApiError::NotFound("Recipe"))
}

/// Reject tag or ingredient ids that do not exist
async fn ensure_references(
    state: &AppState,
    tags: &[Uuid],
    ingredients: &[IngredientAmount],
) -> ApiResult<()> {
    let found = state.tag_repository.count_existing(tags).await?;
    if found != tags.len() as i64 {
        return Err(ApiError::validation("tags", "Unknown tag id"));
    }

    let ingredient_ids: Vec<Uuid> = ingredients.iter().map(|line| line.id).collect();
    let found = state
        .ingredient_repository
        .count_existing(&ingredient_ids)
        .await?;
    if found != ingredient_ids.len() as i64 {
        return Err(ApiError::validation("ingredients", "Unknown ingredient id"));
    }

    Ok(())
}

/// List recipes with filters
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<RecipeQuery>,
) -> ApiResult<Json<Page<RecipeResponse>>> {
    let page = state.page_request(query.page, query.limit);
    let filter = query.filter(viewer.id());

    let (rows, count) = state
        .recipe_repository
        .list(&filter, viewer.id(), page)
        .await?;
    let recipes = to_responses(&state, rows).await?;

    Ok(Json(Page::new(
        recipes,
        count,
        page,
        state.settings.base_url(),
        &uri,
    )))
}

/// Create a recipe authored by the current user
pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<RecipeRequest>,
) -> ApiResult<impl IntoResponse> {
    let recipe = validation::validate_new_recipe(&payload, &state.settings)?;
    ensure_references(&state, &recipe.tags, &recipe.ingredients).await?;

    let image = state.media.save("recipes", &recipe.image).await?;
    let id = match state.recipe_repository.create(user.id, &recipe, &image).await {
        Ok(id) => id,
        Err(e) => {
            state.media.delete(&image).await;
            return Err(e.into());
        }
    };

    let response = load_response(&state, id, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a recipe
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecipeResponse>> {
    Ok(Json(load_response(&state, id, viewer.id()).await?))
}

/// Update a recipe; only its author may do so
pub async fn update_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<RecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    let (author_id, previous_image) = state
        .recipe_repository
        .owner_and_image(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    user.require_owner(author_id)?;

    let changes = validation::validate_recipe_changes(&payload, &state.settings)?;
    ensure_references(&state, &changes.tags, &changes.ingredients).await?;

    let image = match &changes.image {
        Some(image) => Some(state.media.save("recipes", image).await?),
        None => None,
    };

    if let Err(e) = state
        .recipe_repository
        .update(id, &changes, image.as_deref())
        .await
    {
        if let Some(image) = &image {
            state.media.delete(image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        state.media.delete(&previous_image).await;
    }

    Ok(Json(load_response(&state, id, Some(user.id)).await?))
}

/// Delete a recipe; only its author may do so
pub async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (author_id, _) = state
        .recipe_repository
        .owner_and_image(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    user.require_owner(author_id)?;

    if let Some(image) = state.recipe_repository.delete(id).await? {
        state.media.delete(&image).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Short link to a recipe
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.recipe_repository.exists(id).await? {
        return Err(ApiError::NotFound("Recipe"));
    }

    let link = format!("{}/s/{}", state.settings.base_url(), short_code(id));
    Ok(Json(json!({ "short-link": link })))
}

/// Resolve a short link
pub async fn follow_short_link(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Response> {
    let id = decode_short_code(&code).ok_or(ApiError::NotFound("Recipe"))?;
    if !state.recipe_repository.exists(id).await? {
        return Err(ApiError::NotFound("Recipe"));
    }

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, format!("/recipes/{}", id))],
    )
        .into_response())
}

async fn add_to_list(
    state: &AppState,
    list: RecipeList,
    user: &AuthUser,
    id: Uuid,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    let recipe = state
        .recipe_repository
        .find_short(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;

    if !state.recipe_repository.add_to(list, user.id, id).await? {
        return Err(ApiError::BadRequest(match list {
            RecipeList::Favorites => "Recipe is already in favorites".to_string(),
            RecipeList::ShoppingCart => "Recipe is already in the shopping cart".to_string(),
        }));
    }

    info!("User {} added recipe {} to {:?}", user.id, id, list);
    Ok((StatusCode::CREATED, Json(recipe.into_response(&state.media))))
}

async fn remove_from_list(
    state: &AppState,
    list: RecipeList,
    user: &AuthUser,
    id: Uuid,
) -> ApiResult<StatusCode> {
    if !state.recipe_repository.exists(id).await? {
        return Err(ApiError::NotFound("Recipe"));
    }

    if !state.recipe_repository.remove_from(list, user.id, id).await? {
        return Err(ApiError::BadRequest(match list {
            RecipeList::Favorites => "Recipe is not in favorites".to_string(),
            RecipeList::ShoppingCart => "Recipe is not in the shopping cart".to_string(),
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add_to_list(&state, RecipeList::Favorites, &user, id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    remove_from_list(&state, RecipeList::Favorites, &user, id).await
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add_to_list(&state, RecipeList::ShoppingCart, &user, id).await
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    remove_from_list(&state, RecipeList::ShoppingCart, &user, id).await
}

/// Download the aggregated shopping list as a text file
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Response> {
    let lines = state.recipe_repository.cart_lines(user.id).await?;
    let body = shopping_list::build(lines);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_code_round_trips() {
        let id = Uuid::new_v4();
        let code = short_code(id);

        assert_eq!(code.len(), 22);
        assert!(!code.contains('='));
        assert_eq!(decode_short_code(&code), Some(id));
    }

    #[test]
    fn bad_short_codes_are_rejected() {
        assert_eq!(decode_short_code("not base64!"), None);
        assert_eq!(decode_short_code("AAAA"), None);
    }
}
