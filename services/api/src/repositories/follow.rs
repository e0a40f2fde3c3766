//! Follow edges between users

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{models::UserRow, pagination::PageRequest};

#[derive(Clone)]
pub struct FollowRepository {
    pool: PgPool,
}

impl FollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Follow `following_id`; `false` if the edge already existed
    pub async fn follow(&self, user_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (user_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!("User {} subscribed to {}", user_id, following_id);
        }
        Ok(created)
    }

    /// Unfollow `following_id`; `false` if there was no edge
    pub async fn unfollow(&self, user_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
            .bind(user_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("User {} unsubscribed from {}", user_id, following_id);
        }
        Ok(deleted)
    }

    /// Users followed by `user_id`, most recently followed first
    pub async fn subscriptions(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<UserRow>, i64)> {
        let users = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
                   TRUE AS is_subscribed
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, count))
    }
}
