//! User repository for database operations

use anyhow::Result;
use common::password;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{NewUser, RegisteredUser, UserRow},
    pagination::PageRequest,
};

/// Columns of a [`UserRow`] with `is_subscribed` computed for the viewer in `$1`
const USER_COLUMNS: &str = r#"
    u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
    EXISTS (
        SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.following_id = u.id
    ) AS is_subscribed
"#;

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user, or return `None` if the email or username is taken
    pub async fn create(&self, user: &NewUser) -> Result<Option<RegisteredUser>> {
        let plain = user.password.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;

        let created = sqlx::query_as::<_, RegisteredUser>(
            r#"
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING id, email, username, first_name, last_name
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = &created {
            info!("Registered user {} ({})", created.username, created.id);
        }

        Ok(created)
    }

    /// List users, oldest first
    pub async fn list(&self, viewer: Option<Uuid>, page: PageRequest) -> Result<(Vec<UserRow>, i64)> {
        let users = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            ORDER BY u.created_at, u.id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(viewer)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, count))
    }

    /// Find a user by ID as seen by `viewer`
    pub async fn find_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            WHERE u.id = $2
            "#
        ))
        .bind(viewer)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check that a user exists
    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Verify a user's current password
    ///
    /// Argon2 verification is CPU bound and runs on the blocking pool.
    pub async fn verify_password(&self, id: Uuid, candidate: &str) -> Result<bool> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(hash) = hash else {
            return Ok(false);
        };
        let candidate = candidate.to_string();

        tokio::task::spawn_blocking(move || password::verify_password(&hash, &candidate)).await?
    }

    /// Replace a user's password
    pub async fn update_password(&self, id: Uuid, new_password: &str) -> Result<()> {
        let plain = new_password.to_string();
        let password_hash =
            tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        info!("Password changed for user {}", id);
        Ok(())
    }

    /// Current avatar path of a user
    pub async fn avatar(&self, id: Uuid) -> Result<Option<String>> {
        let avatar: Option<Option<String>> =
            sqlx::query_scalar("SELECT avatar FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(avatar.flatten())
    }

    /// Set or clear the avatar path
    pub async fn set_avatar(&self, id: Uuid, avatar: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
