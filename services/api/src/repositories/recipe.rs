//! Recipe repository for database operations

use std::collections::HashMap;

use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{
        IngredientAmount, NewRecipe, RecipeChanges, RecipeFilter, RecipeIngredient, RecipeRow,
        ShortRecipeRow, Tag,
    },
    pagination::PageRequest,
    shopping_list::CartLine,
};

/// Per-user recipe collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagLink {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(sqlx::FromRow)]
struct IngredientLink {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    ingredient: RecipeIngredient,
}

#[derive(sqlx::FromRow)]
struct AuthorRecipe {
    author_id: Uuid,
    #[sqlx(flatten)]
    recipe: ShortRecipeRow,
}

/// Tags and ingredients of a set of recipes, keyed by recipe id
#[derive(Debug, Default)]
pub struct RecipeRelations {
    pub tags: HashMap<Uuid, Vec<Tag>>,
    pub ingredients: HashMap<Uuid, Vec<RecipeIngredient>>,
}

impl RecipeRelations {
    pub fn take(&mut self, recipe_id: Uuid) -> (Vec<Tag>, Vec<RecipeIngredient>) {
        (
            self.tags.remove(&recipe_id).unwrap_or_default(),
            self.ingredients.remove(&recipe_id).unwrap_or_default(),
        )
    }
}

/// Push the select list of a [`RecipeRow`] for `viewer`
fn push_recipe_select(builder: &mut QueryBuilder<'_, Postgres>, viewer: Option<Uuid>) {
    builder.push(
        r#"
        SELECT r.id, r.name, r.text, r.image, r.cooking_time, r.created_at,
               u.id AS author_id, u.email AS author_email, u.username AS author_username,
               u.first_name AS author_first_name, u.last_name AS author_last_name,
               u.avatar AS author_avatar,
               EXISTS (SELECT 1 FROM follows f WHERE f.following_id = u.id AND f.user_id = "#,
    );
    builder.push_bind(viewer);
    builder.push(
        r#") AS author_is_subscribed,
               EXISTS (SELECT 1 FROM favorites fa WHERE fa.recipe_id = r.id AND fa.user_id = "#,
    );
    builder.push_bind(viewer);
    builder.push(
        r#") AS is_favorited,
               EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = "#,
    );
    builder.push_bind(viewer);
    builder.push(
        r#") AS is_in_shopping_cart
        FROM recipes r
        JOIN users u ON u.id = r.author_id
        "#,
    );
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    builder.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ");
        builder.push_bind(author);
    }
    if !filter.tags.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        builder.push_bind(filter.tags.clone());
        builder.push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        builder.push(" AND EXISTS (SELECT 1 FROM favorites fv WHERE fv.recipe_id = r.id AND fv.user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        builder.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart cart WHERE cart.recipe_id = r.id AND cart.user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(")");
    }
}

async fn insert_relations(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tags: &[Uuid],
    ingredients: &[IngredientAmount],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
        "#,
    )
    .bind(recipe_id)
    .bind(tags)
    .execute(&mut **tx)
    .await?;

    let ingredient_ids: Vec<Uuid> = ingredients.iter().map(|line| line.id).collect();
    let amounts: Vec<i32> = ingredients.iter().map(|line| line.amount).collect();

    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM UNNEST($2::uuid[], $3::int4[]) AS lines(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Recipe repository for database operations
#[derive(Clone)]
pub struct RecipeRepository {
    pool: PgPool,
}

impl RecipeRepository {
    /// Create a new recipe repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List recipes matching `filter`, newest first
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<RecipeRow>, i64)> {
        let mut query = QueryBuilder::new("");
        push_recipe_select(&mut query, viewer);
        push_filters(&mut query, filter);
        query.push(" ORDER BY r.created_at DESC, r.id LIMIT ");
        query.push_bind(page.limit());
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let recipes = query
            .build_query_as::<RecipeRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut count_query, filter);
        let count: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((recipes, count))
    }

    /// Find a recipe by ID as seen by `viewer`
    pub async fn find_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<RecipeRow>> {
        let mut query = QueryBuilder::new("");
        push_recipe_select(&mut query, viewer);
        query.push(" WHERE r.id = ");
        query.push_bind(id);

        let recipe = query
            .build_query_as::<RecipeRow>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(recipe)
    }

    /// Load tags and ingredients for many recipes in two queries
    pub async fn relations(&self, recipe_ids: &[Uuid]) -> Result<RecipeRelations> {
        let mut relations = RecipeRelations::default();
        if recipe_ids.is_empty() {
            return Ok(relations);
        }

        let tags = sqlx::query_as::<_, TagLink>(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        for link in tags {
            relations.tags.entry(link.recipe_id).or_default().push(link.tag);
        }

        let ingredients = sqlx::query_as::<_, IngredientLink>(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        for link in ingredients {
            relations
                .ingredients
                .entry(link.recipe_id)
                .or_default()
                .push(link.ingredient);
        }

        Ok(relations)
    }

    /// Author and image of a recipe
    pub async fn owner_and_image(&self, id: Uuid) -> Result<Option<(Uuid, String)>> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT author_id, image FROM recipes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM recipes WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a recipe with its tags and ingredients in one transaction
    pub async fn create(&self, author_id: Uuid, recipe: &NewRecipe, image: &str) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (author_id, name, text, image, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(image)
        .bind(recipe.cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        insert_relations(&mut tx, id, &recipe.tags, &recipe.ingredients).await?;
        tx.commit().await?;

        info!("User {} created recipe {}", author_id, id);
        Ok(id)
    }

    /// Apply changes and replace tags and ingredients in one transaction
    pub async fn update(&self, id: Uuid, changes: &RecipeChanges, image: Option<&str>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE recipes
            SET name = COALESCE($2, name),
                text = COALESCE($3, text),
                cooking_time = COALESCE($4, cooking_time),
                image = COALESCE($5, image)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.text)
        .bind(changes.cooking_time)
        .bind(image)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_relations(&mut tx, id, &changes.tags, &changes.ingredients).await?;
        tx.commit().await?;

        info!("Updated recipe {}", id);
        Ok(())
    }

    /// Delete a recipe, returning its image path
    pub async fn delete(&self, id: Uuid) -> Result<Option<String>> {
        let image: Option<String> =
            sqlx::query_scalar("DELETE FROM recipes WHERE id = $1 RETURNING image")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        if image.is_some() {
            info!("Deleted recipe {}", id);
        }
        Ok(image)
    }

    pub async fn find_short(&self, id: Uuid) -> Result<Option<ShortRecipeRow>> {
        let recipe = sqlx::query_as::<_, ShortRecipeRow>(
            "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recipe)
    }

    /// Add a recipe to a user's list; `false` if already present
    pub async fn add_to(&self, list: RecipeList, user_id: Uuid, recipe_id: Uuid) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            list.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a recipe from a user's list; `false` if it was not there
    pub async fn remove_from(
        &self,
        list: RecipeList,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            list.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Newest recipes of each author, at most `per_author` each
    pub async fn short_by_authors(
        &self,
        author_ids: &[Uuid],
        per_author: Option<u32>,
    ) -> Result<HashMap<Uuid, Vec<ShortRecipeRow>>> {
        let rows = sqlx::query_as::<_, AuthorRecipe>(
            r#"
            SELECT author_id, id, name, image, cooking_time
            FROM (
                SELECT r.author_id, r.id, r.name, r.image, r.cooking_time, r.created_at,
                       ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.created_at DESC) AS author_rank
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::bigint IS NULL OR author_rank <= $2
            ORDER BY author_id, created_at DESC
            "#,
        )
        .bind(author_ids)
        .bind(per_author.map(i64::from))
        .fetch_all(&self.pool)
        .await?;

        let mut by_author: HashMap<Uuid, Vec<ShortRecipeRow>> = HashMap::new();
        for row in rows {
            by_author.entry(row.author_id).or_default().push(row.recipe);
        }
        Ok(by_author)
    }

    /// Number of recipes per author
    pub async fn count_by_authors(&self, author_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT author_id, COUNT(*)
            FROM recipes
            WHERE author_id = ANY($1)
            GROUP BY author_id
            "#,
        )
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Raw ingredient lines of every recipe in a user's cart
    pub async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT i.name, i.measurement_unit, ri.amount
            FROM shopping_cart sc
            JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE sc.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}
