//! Tag repository

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{Tag, TagRequest};

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    /// How many of `ids` exist
    pub async fn count_existing(&self, ids: &[Uuid]) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Insert a validated tag; `None` if the name or slug is taken
    pub async fn create(&self, tag: &TagRequest) -> Result<Option<Tag>> {
        let created = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING id, name, slug
            "#,
        )
        .bind(&tag.name)
        .bind(&tag.slug)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = &created {
            info!("Created tag {} ({})", created.slug, created.id);
        }
        Ok(created)
    }

    /// Apply a validated patch; unique violations surface as errors
    pub async fn update(&self, id: Uuid, changes: &TagRequest) -> Result<Option<Tag>> {
        let updated = sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = COALESCE($2, name), slug = COALESCE($3, slug)
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
