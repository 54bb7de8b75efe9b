use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::auth::policy::Owned;

/// Workout record in the database.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workout_type_id: i32,
    pub description: Option<String>,
    pub date: Date,
    pub duration_min: i32,
    pub intensity: i32,
    pub calories_burned: i32,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Owned for Workout {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Listing row with the type and owner names joined in.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workout: Workout,
    pub workout_type_name: String,
    pub user_name: String,
}

/// Lookup entry for the workout type dropdown.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct WorkoutType {
    pub id: i32,
    pub name: String,
}
