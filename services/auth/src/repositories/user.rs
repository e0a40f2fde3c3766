//! User repository for database operations

use anyhow::Result;
use common::{password, role::Role};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        info!("Finding user by email: {}", email);

        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let role: String = row.get("role");
                let user = User {
                    id: row.get("id"),
                    email: row.get("email"),
                    password_hash: row.get("password_hash"),
                    role: role.parse::<Role>().map_err(anyhow::Error::msg)?,
                };
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Verify a user's password
    ///
    /// Argon2 verification is CPU bound and runs on the blocking pool.
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let hash = user.password_hash.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || password::verify_password(&hash, &password)).await?
    }
}
