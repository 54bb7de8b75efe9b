use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::forms::{Created, Outcome};
use crate::recipes::dto::RecipeInput;
use crate::recipes::repo::RecipeStore;
use crate::recipes::repo_types::{Recipe, RecipeListItem};

pub const NOT_FOUND: &str = "Recipe not found.";

/// Recipe CRUD. Update and delete assume the caller already checked ownership.
#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn RecipeStore>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, viewer: Option<Uuid>) -> Result<Vec<RecipeListItem>, AppError> {
        self.store.list_visible(viewer).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        self.store.get(id).await
    }

    pub async fn create(&self, input: &RecipeInput, owner_id: Uuid) -> Result<Created, AppError> {
        let id = self.store.insert(input, owner_id).await?;
        info!(recipe_id = %id, user_id = %owner_id, "recipe created");
        Ok(Created {
            id,
            message: "Recipe added successfully!".into(),
        })
    }

    pub async fn update(&self, id: Uuid, input: &RecipeInput) -> Result<Outcome, AppError> {
        if !self.store.update(id, input).await? {
            return Err(AppError::NotFound(NOT_FOUND.into()));
        }
        info!(recipe_id = %id, "recipe updated");
        Ok(Outcome {
            message: "Recipe updated successfully!".into(),
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<Outcome, AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(NOT_FOUND.into()));
        }
        info!(recipe_id = %id, "recipe deleted");
        Ok(Outcome {
            message: "Recipe deleted successfully!".into(),
        })
    }
}
