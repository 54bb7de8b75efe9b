use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::policy::Owned;

/// Recipe record in the database.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub total_calories: i32,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

impl Owned for Recipe {
    fn owner_id(&self) -> Uuid {
        self.created_by
    }
}

/// Listing row: the recipe joined with its author's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author_name: String,
}
