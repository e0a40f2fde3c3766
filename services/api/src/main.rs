use anyhow::Result;
use tracing::info;

use api::{AppState, config::ApiSettings, create_router};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};

#[tokio::main]
async fn main() -> Result<()> {
    common::init_tracing();

    info!("Starting API service");

    let settings = ApiSettings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.run_migrations {
        database::run_migrations(&pool).await?;
    }

    // Only the public key is needed to verify tokens
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    if !redis_pool.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    tokio::fs::create_dir_all(&settings.media_root).await?;

    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState::new(pool, settings, jwt_service, redis_pool);

    info!(
        "API service initialized successfully (media root: {})",
        app_state.media.root().display()
    );

    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
