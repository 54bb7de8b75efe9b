use serde::Deserialize;

use crate::error::{FieldError, ValidationErrors};
use crate::forms::{checkbox, non_negative, optional_text, text};

pub const TITLE_MAX_CHARS: usize = 150;

/// Raw form body for recipe create/update.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub total_calories: Option<String>,
    pub is_public: Option<String>,
    pub csrf_token: Option<String>,
}

/// Validated recipe fields, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeInput {
    pub title: String,
    pub description: Option<String>,
    pub steps: Option<String>,
    pub total_calories: i32,
    pub is_public: bool,
}

impl RecipeForm {
    pub fn validate(&self) -> Result<RecipeInput, ValidationErrors> {
        let title = text(self.title.as_deref());
        let mut errors = Vec::new();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required."));
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.push(FieldError::new(
                "title",
                format!("Title must be at most {TITLE_MAX_CHARS} characters."),
            ));
        }
        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(RecipeInput {
            title,
            description: optional_text(self.description.as_deref()),
            steps: optional_text(self.steps.as_deref()),
            total_calories: non_negative(self.total_calories.as_deref()),
            is_public: checkbox(self.is_public.as_deref()),
        })
    }
}
