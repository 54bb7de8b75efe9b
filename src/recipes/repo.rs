use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::error::AppError;
use crate::recipes::dto::RecipeInput;
use crate::recipes::repo_types::{Recipe, RecipeListItem};

/// Persistence capability for recipes. The owner column is written once, on insert.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Public recipes plus the viewer's private ones, newest first.
    async fn list_visible(&self, viewer: Option<Uuid>) -> Result<Vec<RecipeListItem>, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, AppError>;
    async fn insert(&self, input: &RecipeInput, owner: Uuid) -> Result<Uuid, AppError>;
    /// Returns `false` when no row has `id`.
    async fn update(&self, id: Uuid, input: &RecipeInput) -> Result<bool, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn list_visible(&self, viewer: Option<Uuid>) -> Result<Vec<RecipeListItem>, AppError> {
        let rows = sqlx::query_as::<_, RecipeListItem>(
            r#"
            SELECT r.id, r.title, r.description, r.steps, r.total_calories,
                   r.is_public, r.created_by, r.created_at, u.name AS author_name
            FROM recipes r
            JOIN users u ON u.id = r.created_by
            WHERE r.is_public OR r.created_by = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(viewer)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, title, description, steps, total_calories, is_public, created_by, created_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, input: &RecipeInput, owner: Uuid) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipes (title, description, steps, total_calories, is_public, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.steps)
        .bind(input.total_calories)
        .bind(input.is_public)
        .bind(owner)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: &RecipeInput) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            UPDATE recipes
               SET title = $1, description = $2, steps = $3, total_calories = $4, is_public = $5
             WHERE id = $6
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.steps)
        .bind(input.total_calories)
        .bind(input.is_public)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// In-process recipe table; author names are joined from the given user store.
pub struct MemoryRecipeStore {
    rows: DashMap<Uuid, Recipe>,
    users: Arc<dyn UserStore>,
}

impl MemoryRecipeStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            rows: DashMap::new(),
            users,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn list_visible(&self, viewer: Option<Uuid>) -> Result<Vec<RecipeListItem>, AppError> {
        let mut visible: Vec<Recipe> = self
            .rows
            .iter()
            .filter(|r| r.is_public || Some(r.created_by) == viewer)
            .map(|r| r.value().clone())
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut items = Vec::with_capacity(visible.len());
        for recipe in visible {
            // inner join: recipes whose author vanished are skipped
            if let Some(author) = self.users.find_by_id(recipe.created_by).await? {
                items.push(RecipeListItem {
                    recipe,
                    author_name: author.name,
                });
            }
        }
        Ok(items)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, input: &RecipeInput, owner: Uuid) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        self.rows.insert(
            id,
            Recipe {
                id,
                title: input.title.clone(),
                description: input.description.clone(),
                steps: input.steps.clone(),
                total_calories: input.total_calories,
                is_public: input.is_public,
                created_by: owner,
                created_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: &RecipeInput) -> Result<bool, AppError> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(false);
        };
        row.title = input.title.clone();
        row.description = input.description.clone();
        row.steps = input.steps.clone();
        row.total_calories = input.total_calories;
        row.is_public = input.is_public;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rows.remove(&id).is_some())
    }
}
