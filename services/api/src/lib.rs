//! Foodgram resource service
//!
//! Users, follows, tags, ingredients, recipes, favorites and the shopping
//! cart, served over HTTP with axum. Authentication is delegated to the auth
//! service: this crate only verifies the access tokens it issues.

pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod routes;
pub mod shopping_list;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
