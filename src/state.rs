use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::repo::{MemoryUserStore, PgUserStore, UserStore};
use crate::auth::services::CredentialStore;
use crate::config::AppConfig;
use crate::csrf::CsrfManager;
use crate::recipes::repo::{MemoryRecipeStore, PgRecipeStore, RecipeStore};
use crate::recipes::services::RecipeService;
use crate::session::SessionStore;
use crate::workouts::repo::{MemoryWorkoutStore, PgWorkoutStore, WorkoutStore};
use crate::workouts::services::WorkoutService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: CredentialStore,
    pub recipes: RecipeService,
    pub workouts: WorkoutService,
    pub sessions: SessionStore,
    pub csrf: CsrfManager,
}

impl AppState {
    pub fn from_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        let users = Arc::new(PgUserStore::new(db.clone(), config.default_role_id));
        let recipes = Arc::new(PgRecipeStore::new(db.clone()));
        let workouts = Arc::new(PgWorkoutStore::new(db));
        Self::from_parts(config, users, recipes, workouts)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        recipes: Arc<dyn RecipeStore>,
        workouts: Arc<dyn WorkoutStore>,
    ) -> Self {
        let csrf = CsrfManager::new(config.session.csrf_ttl_secs);
        let sessions = SessionStore::with_idle_timeout(config.session.idle_timeout_secs);
        Self {
            config,
            credentials: CredentialStore::new(users),
            recipes: RecipeService::new(recipes),
            workouts: WorkoutService::new(workouts),
            sessions,
            csrf,
        }
    }

    /// Fully in-memory state for tests and local experiments.
    pub fn fake() -> Self {
        Self::fake_with_users(Arc::new(MemoryUserStore::new()))
    }

    pub fn fake_with_users(users: Arc<MemoryUserStore>) -> Self {
        let recipes = Arc::new(MemoryRecipeStore::new(users.clone()));
        let workouts = Arc::new(MemoryWorkoutStore::new(users.clone()));
        Self::from_parts(
            Arc::new(AppConfig::test_default()),
            users,
            recipes,
            workouts,
        )
    }
}
