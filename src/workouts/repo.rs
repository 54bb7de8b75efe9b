use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::error::AppError;
use crate::workouts::dto::WorkoutInput;
use crate::workouts::repo_types::{Workout, WorkoutListItem, WorkoutType};

/// Persistence capability for workouts and the workout type lookup table.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// All workouts, most recent date first.
    async fn list(&self) -> Result<Vec<WorkoutListItem>, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Workout>, AppError>;
    async fn insert(&self, input: &WorkoutInput, owner: Uuid) -> Result<Uuid, AppError>;
    /// Returns `false` when no row has `id`.
    async fn update(&self, id: Uuid, input: &WorkoutInput) -> Result<bool, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
    async fn workout_types(&self) -> Result<Vec<WorkoutType>, AppError>;
}

pub struct PgWorkoutStore {
    db: PgPool,
}

impl PgWorkoutStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkoutStore for PgWorkoutStore {
    async fn list(&self) -> Result<Vec<WorkoutListItem>, AppError> {
        let rows = sqlx::query_as::<_, WorkoutListItem>(
            r#"
            SELECT w.id, w.user_id, w.workout_type_id, w.description, w.date, w.duration_min,
                   w.intensity, w.calories_burned, w.notes, w.created_at,
                   wt.name AS workout_type_name, u.name AS user_name
            FROM workouts w
            JOIN workout_types wt ON wt.id = w.workout_type_id
            JOIN users u ON u.id = w.user_id
            ORDER BY w.date DESC, w.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Workout>, AppError> {
        let row = sqlx::query_as::<_, Workout>(
            r#"
            SELECT id, user_id, workout_type_id, description, date, duration_min,
                   intensity, calories_burned, notes, created_at
            FROM workouts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, input: &WorkoutInput, owner: Uuid) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO workouts (user_id, workout_type_id, description, date, duration_min,
                                  intensity, calories_burned, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(input.workout_type_id)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.duration_min)
        .bind(input.intensity)
        .bind(input.calories_burned)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: &WorkoutInput) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            UPDATE workouts
               SET workout_type_id = $1, description = $2, date = $3, duration_min = $4,
                   intensity = $5, calories_burned = $6, notes = $7
             WHERE id = $8
            "#,
        )
        .bind(input.workout_type_id)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.duration_min)
        .bind(input.intensity)
        .bind(input.calories_burned)
        .bind(&input.notes)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM workouts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn workout_types(&self) -> Result<Vec<WorkoutType>, AppError> {
        let rows = sqlx::query_as::<_, WorkoutType>(
            "SELECT id, name FROM workout_types ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// In-process workout table seeded with the same types as the migration.
pub struct MemoryWorkoutStore {
    rows: DashMap<Uuid, Workout>,
    types: Vec<WorkoutType>,
    users: Arc<dyn UserStore>,
}

impl MemoryWorkoutStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        let types = [(1, "Cardio"), (2, "Strength"), (3, "Yoga"), (4, "HIIT")]
            .into_iter()
            .map(|(id, name)| WorkoutType {
                id,
                name: name.to_string(),
            })
            .collect();
        Self {
            rows: DashMap::new(),
            types,
            users,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl WorkoutStore for MemoryWorkoutStore {
    async fn list(&self) -> Result<Vec<WorkoutListItem>, AppError> {
        let mut all: Vec<Workout> = self.rows.iter().map(|w| w.value().clone()).collect();
        all.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let mut items = Vec::with_capacity(all.len());
        for workout in all {
            let type_name = self
                .types
                .iter()
                .find(|t| t.id == workout.workout_type_id)
                .map(|t| t.name.clone());
            let owner = self.users.find_by_id(workout.user_id).await?;
            if let (Some(workout_type_name), Some(owner)) = (type_name, owner) {
                items.push(WorkoutListItem {
                    workout,
                    workout_type_name,
                    user_name: owner.name,
                });
            }
        }
        Ok(items)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Workout>, AppError> {
        Ok(self.rows.get(&id).map(|w| w.value().clone()))
    }

    async fn insert(&self, input: &WorkoutInput, owner: Uuid) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        self.rows.insert(
            id,
            Workout {
                id,
                user_id: owner,
                workout_type_id: input.workout_type_id,
                description: input.description.clone(),
                date: input.date,
                duration_min: input.duration_min,
                intensity: input.intensity,
                calories_burned: input.calories_burned,
                notes: input.notes.clone(),
                created_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: &WorkoutInput) -> Result<bool, AppError> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(false);
        };
        row.workout_type_id = input.workout_type_id;
        row.description = input.description.clone();
        row.date = input.date;
        row.duration_min = input.duration_min;
        row.intensity = input.intensity;
        row.calories_burned = input.calories_burned;
        row.notes = input.notes.clone();
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rows.remove(&id).is_some())
    }

    async fn workout_types(&self) -> Result<Vec<WorkoutType>, AppError> {
        let mut types = self.types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }
}
