use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::AppError;

pub const EMAIL_TAKEN: &str = "Email address is already registered.";

/// Persistence capability for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user with the default role; a duplicate email is a `Conflict`.
    async fn insert(&self, name: &str, email: &str, password_hash: &str)
        -> Result<Uuid, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    /// Role name joined from the roles table.
    async fn role_name(&self, id: Uuid) -> Result<Option<String>, AppError>;
}

pub struct PgUserStore {
    db: PgPool,
    default_role_id: i32,
}

impl PgUserStore {
    pub fn new(db: PgPool, default_role_id: i32) -> Self {
        Self {
            db,
            default_role_id,
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (role_id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(self.default_role_id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(EMAIL_TAKEN.into()),
            other => other,
        })?;
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role_id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role_id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn role_name(&self, id: Uuid) -> Result<Option<String>, AppError> {
        let name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(name)
    }
}

pub const ADMIN_ROLE_ID: i32 = 1;
pub const REGULAR_ROLE_ID: i32 = 2;

/// In-process store keyed by email, mirroring the unique index of the users table.
#[derive(Default)]
pub struct MemoryUserStore {
    by_email: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_role(&self, id: Uuid, role_id: i32) {
        for mut user in self.by_email.iter_mut() {
            if user.id == id {
                user.role_id = role_id;
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_email.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Uuid, AppError> {
        use dashmap::mapref::entry::Entry;

        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(EMAIL_TAKEN.into())),
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(User {
                    id,
                    role_id: REGULAR_ROLE_ID,
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: OffsetDateTime::now_utc(),
                });
                Ok(id)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.by_email.get(email).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .by_email
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.value().clone()))
    }

    async fn role_name(&self, id: Uuid) -> Result<Option<String>, AppError> {
        let role_id = self.by_email.iter().find(|u| u.id == id).map(|u| u.role_id);
        Ok(role_id.map(|r| {
            if r == ADMIN_ROLE_ID {
                "admin".to_string()
            } else {
                "regular".to_string()
            }
        }))
    }
}
