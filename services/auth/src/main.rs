use anyhow::Result;
use tracing::info;

mod config;
mod error;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};

use crate::{
    config::AuthSettings, rate_limiter::RateLimiter, repositories::UserRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub rate_limiter: RateLimiter,
}

#[tokio::main]
async fn main() -> Result<()> {
    common::init_tracing();

    info!("Starting authentication service");

    let settings = AuthSettings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    if !redis_pool.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    let app_state = AppState {
        redis_pool,
        jwt_service,
        user_repository: UserRepository::new(pool),
        rate_limiter: RateLimiter::new(settings.rate_limiter()),
    };

    info!(
        "Authentication service initialized successfully (login limit: {} attempts per {}s)",
        app_state.rate_limiter.config().max_attempts,
        app_state.rate_limiter.config().window_seconds
    );

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Authentication service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
