//! Recipe payloads, rows and representations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    images::{DecodedImage, MediaStorage},
    models::{tag::Tag, user::{UserResponse, UserRow}},
};

/// One ingredient line of a recipe payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Recipe payload for both create and update
///
/// Every field is optional at the wire level so that missing fields surface
/// as validation errors naming the field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipeRequest {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// A validated recipe ready to be inserted
#[derive(Debug)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

/// A validated partial update; tags and ingredients are always replaced
#[derive(Debug)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

/// Recipe list query
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub author: Option<Uuid>,
    /// Tag slugs; a recipe matches if it carries any of them
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

fn truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

impl RecipeQuery {
    /// Resolve the query into a filter; the per-user flags need a viewer
    pub fn filter(&self, viewer: Option<Uuid>) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            tags: self.tags.clone(),
            favorited_by: viewer.filter(|_| truthy(self.is_favorited.as_deref())),
            in_cart_of: viewer.filter(|_| truthy(self.is_in_shopping_cart.as_deref())),
        }
    }
}

/// Filters applied to the recipe list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}

/// A recipe joined with its author, as seen by a viewer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub author_id: Uuid,
    pub author_email: String,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_avatar: Option<String>,
    pub author_is_subscribed: bool,
}

impl RecipeRow {
    pub fn author(&self) -> UserRow {
        UserRow {
            id: self.author_id,
            email: self.author_email.clone(),
            username: self.author_username.clone(),
            first_name: self.author_first_name.clone(),
            last_name: self.author_last_name.clone(),
            avatar: self.author_avatar.clone(),
            is_subscribed: self.author_is_subscribed,
        }
    }
}

/// Ingredient line of a stored recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    pub fn new(
        row: RecipeRow,
        tags: Vec<Tag>,
        ingredients: Vec<RecipeIngredient>,
        media: &MediaStorage,
    ) -> Self {
        let author = row.author().into_response(media);
        Self {
            id: row.id,
            tags,
            author,
            ingredients,
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            image: media.url(&row.image),
            name: row.name,
            text: row.text,
            cooking_time: row.cooking_time,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShortRecipeRow {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Short recipe representation used by favorites, cart and subscriptions
#[derive(Debug, Clone, Serialize)]
pub struct ShortRecipe {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipeRow {
    pub fn into_response(self, media: &MediaStorage) -> ShortRecipe {
        ShortRecipe {
            id: self.id,
            image: media.url(&self.image),
            name: self.name,
            cooking_time: self.cooking_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_need_a_viewer() {
        let query = RecipeQuery {
            is_favorited: Some("1".to_string()),
            is_in_shopping_cart: Some("true".to_string()),
            ..Default::default()
        };

        let anonymous = query.filter(None);
        assert_eq!(anonymous.favorited_by, None);
        assert_eq!(anonymous.in_cart_of, None);

        let viewer = Uuid::new_v4();
        let filter = query.filter(Some(viewer));
        assert_eq!(filter.favorited_by, Some(viewer));
        assert_eq!(filter.in_cart_of, Some(viewer));
    }

    #[test]
    fn zero_flag_is_ignored() {
        let query = RecipeQuery {
            is_favorited: Some("0".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter(Some(Uuid::new_v4())).favorited_by, None);
    }

    #[test]
    fn response_uses_media_urls() {
        let media = MediaStorage::new("media", "/media");
        let row = RecipeRow {
            id: Uuid::new_v4(),
            name: "Soup".to_string(),
            text: "Boil".to_string(),
            image: "recipes/soup.png".to_string(),
            cooking_time: 30,
            created_at: Utc::now(),
            is_favorited: true,
            is_in_shopping_cart: false,
            author_id: Uuid::new_v4(),
            author_email: "cook@example.com".to_string(),
            author_username: "cook".to_string(),
            author_first_name: "Ada".to_string(),
            author_last_name: "Cook".to_string(),
            author_avatar: None,
            author_is_subscribed: false,
        };

        let response = RecipeResponse::new(row, vec![], vec![], &media);
        assert_eq!(response.image, "/media/recipes/soup.png");
        assert_eq!(response.author.username, "cook");
        assert!(response.is_favorited);
    }
}
