//! Repositories for database operations
//!
//! Repositories return `anyhow::Result` and know nothing about HTTP. Queries
//! that depend on who is looking take an optional viewer id and compute the
//! per-viewer flags (`is_subscribed`, `is_favorited`, `is_in_shopping_cart`)
//! in SQL.

pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod tag;
pub mod user;

pub use follow::FollowRepository;
pub use ingredient::IngredientRepository;
pub use recipe::{RecipeList, RecipeRepository};
pub use tag::TagRepository;
pub use user::UserRepository;
