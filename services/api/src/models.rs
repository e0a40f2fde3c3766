//! API models for request and response payloads
//!
//! Rows read from the database carry stored media paths; the response types
//! carry public URLs. Conversion happens through [`MediaStorage`].
//!
//! [`MediaStorage`]: crate::images::MediaStorage

pub mod ingredient;
pub mod recipe;
pub mod tag;
pub mod user;

pub use ingredient::{Ingredient, IngredientQuery, IngredientRequest};
pub use recipe::{
    IngredientAmount, NewRecipe, RecipeChanges, RecipeFilter, RecipeIngredient, RecipeQuery,
    RecipeRequest, RecipeResponse, RecipeRow, ShortRecipe, ShortRecipeRow,
};
pub use tag::{Tag, TagRequest};
pub use user::{
    AvatarRequest, AvatarResponse, NewUser, RegisterRequest, RegisteredUser, SetPasswordRequest,
    SubscriptionQuery, SubscriptionResponse, UserResponse, UserRow,
};
