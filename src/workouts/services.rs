use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, ValidationErrors};
use crate::forms::{Created, Outcome};
use crate::workouts::dto::WorkoutInput;
use crate::workouts::repo::WorkoutStore;
use crate::workouts::repo_types::{Workout, WorkoutListItem, WorkoutType};

pub const NOT_FOUND: &str = "Workout not found.";

/// Workout CRUD. Update and delete assume the caller already checked ownership.
#[derive(Clone)]
pub struct WorkoutService {
    store: Arc<dyn WorkoutStore>,
}

impl WorkoutService {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<WorkoutListItem>, AppError> {
        self.store.list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Workout>, AppError> {
        self.store.get(id).await
    }

    pub async fn workout_types(&self) -> Result<Vec<WorkoutType>, AppError> {
        self.store.workout_types().await
    }

    pub async fn create(&self, input: &WorkoutInput, owner_id: Uuid) -> Result<Created, AppError> {
        self.ensure_known_type(input.workout_type_id).await?;
        let id = self.store.insert(input, owner_id).await?;
        info!(workout_id = %id, user_id = %owner_id, "workout created");
        Ok(Created {
            id,
            message: "Workout added successfully!".into(),
        })
    }

    pub async fn update(&self, id: Uuid, input: &WorkoutInput) -> Result<Outcome, AppError> {
        self.ensure_known_type(input.workout_type_id).await?;
        if !self.store.update(id, input).await? {
            return Err(AppError::NotFound(NOT_FOUND.into()));
        }
        info!(workout_id = %id, "workout updated");
        Ok(Outcome {
            message: "Workout updated successfully!".into(),
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<Outcome, AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(NOT_FOUND.into()));
        }
        info!(workout_id = %id, "workout deleted");
        Ok(Outcome {
            message: "Workout deleted successfully!".into(),
        })
    }

    async fn ensure_known_type(&self, type_id: i32) -> Result<(), AppError> {
        let types = self.store.workout_types().await?;
        if types.iter().any(|t| t.id == type_id) {
            Ok(())
        } else {
            Err(ValidationErrors::single("workout_type_id", "Unknown workout type.").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{MemoryUserStore, UserStore};
    use crate::workouts::dto::parse_date;
    use crate::workouts::repo::MemoryWorkoutStore;

    fn input(type_id: i32, date: &str) -> WorkoutInput {
        WorkoutInput {
            workout_type_id: type_id,
            description: Some("Intervals".into()),
            date: parse_date(date).unwrap(),
            duration_min: 30,
            intensity: 7,
            calories_burned: 300,
            notes: None,
        }
    }

    async fn setup_with_store() -> (WorkoutService, Arc<MemoryWorkoutStore>, Uuid) {
        let users = Arc::new(MemoryUserStore::new());
        let coach = users.insert("Coach", "coach@example.com", "x").await.unwrap();
        let store = Arc::new(MemoryWorkoutStore::new(users));
        (WorkoutService::new(store.clone()), store, coach)
    }

    async fn setup() -> (WorkoutService, Uuid) {
        let (svc, _, coach) = setup_with_store().await;
        (svc, coach)
    }

    #[tokio::test]
    async fn list_joins_names_and_orders_by_date() {
        let (svc, coach) = setup().await;
        svc.create(&input(1, "2025-01-01"), coach).await.unwrap();
        svc.create(&input(3, "2025-02-01"), coach).await.unwrap();

        let items = svc.list().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].workout_type_name, "Yoga");
        assert_eq!(items[1].workout_type_name, "Cardio");
        assert!(items.iter().all(|i| i.user_name == "Coach"));
    }

    #[tokio::test]
    async fn unknown_type_is_a_validation_error() {
        let (svc, store, coach) = setup_with_store().await;
        let err = svc.create(&input(99, "2025-01-01"), coach).await.unwrap_err();
        match err {
            AppError::Validation(v) => assert!(v.has_field("workout_type_id")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let (svc, coach) = setup().await;
        let created = svc.create(&input(2, "2025-01-01"), coach).await.unwrap();

        svc.update(created.id, &input(4, "2025-01-02")).await.unwrap();
        let stored = svc.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.workout_type_id, 4);
        assert_eq!(stored.user_id, coach);

        svc.delete(created.id).await.unwrap();
        assert!(matches!(
            svc.update(created.id, &input(1, "2025-01-01")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn types_are_sorted_by_name() {
        let (svc, _) = setup().await;
        let names: Vec<_> = svc
            .workout_types()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Cardio", "HIIT", "Strength", "Yoga"]);
    }
}
