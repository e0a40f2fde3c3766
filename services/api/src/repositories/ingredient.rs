//! Ingredient repository

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{Ingredient, IngredientRequest};

#[derive(Clone)]
pub struct IngredientRepository {
    pool: PgPool,
}

/// Escape LIKE wildcards so a search prefix matches literally
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

impl IngredientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ingredients ordered by name, optionally filtered by a case-insensitive prefix
    pub async fn search(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let pattern = name_prefix
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(like_prefix);

        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, measurement_unit
            FROM ingredients
            WHERE $1::text IS NULL OR lower(name) LIKE $1
            ORDER BY name, measurement_unit
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(ingredients)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    /// How many of `ids` exist
    pub async fn count_existing(&self, ids: &[Uuid]) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Insert a validated ingredient; `None` if the (name, unit) pair exists
    pub async fn create(&self, ingredient: &IngredientRequest) -> Result<Option<Ingredient>> {
        let created = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = &created {
            info!("Created ingredient {} ({})", created.name, created.id);
        }
        Ok(created)
    }

    /// Apply a validated patch; unique violations surface as errors
    pub async fn update(
        &self,
        id: Uuid,
        changes: &IngredientRequest,
    ) -> Result<Option<Ingredient>> {
        let updated = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients
            SET name = COALESCE($2, name),
                measurement_unit = COALESCE($3, measurement_unit)
            WHERE id = $1
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.measurement_unit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
