//! Application state shared across handlers

use std::sync::Arc;

use common::{cache::RedisPool, jwt::JwtService};
use sqlx::PgPool;

use crate::{
    config::ApiSettings,
    images::MediaStorage,
    pagination::PageRequest,
    repositories::{
        FollowRepository, IngredientRepository, RecipeRepository, TagRepository, UserRepository,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<ApiSettings>,
    pub jwt_service: JwtService,
    pub redis_pool: RedisPool,
    pub media: MediaStorage,
    pub user_repository: UserRepository,
    pub follow_repository: FollowRepository,
    pub tag_repository: TagRepository,
    pub ingredient_repository: IngredientRepository,
    pub recipe_repository: RecipeRepository,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        settings: ApiSettings,
        jwt_service: JwtService,
        redis_pool: RedisPool,
    ) -> Self {
        let media = MediaStorage::new(&settings.media_root, &settings.media_url);

        Self {
            user_repository: UserRepository::new(db_pool.clone()),
            follow_repository: FollowRepository::new(db_pool.clone()),
            tag_repository: TagRepository::new(db_pool.clone()),
            ingredient_repository: IngredientRepository::new(db_pool.clone()),
            recipe_repository: RecipeRepository::new(db_pool.clone()),
            db_pool,
            settings: Arc::new(settings),
            jwt_service,
            redis_pool,
            media,
        }
    }

    /// Page request built from query parameters and the configured sizes
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::new(
            page,
            limit,
            self.settings.page_size,
            self.settings.max_page_size,
        )
    }
}
