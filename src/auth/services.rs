use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{Registered, UserPublicView},
    password::{hash_password, verify_dummy, verify_password},
    repo::UserStore,
    repo_types::Role,
};
use crate::error::{AppError, AuthError, FieldError, ValidationErrors};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and role lookup over a [`UserStore`].
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registered, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        let mut errors = Vec::new();
        if !is_valid_email(&email) {
            errors.push(FieldError::new("email", "Invalid email format provided."));
        }
        if name.is_empty() {
            errors.push(FieldError::new("name", "Name is required."));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
            ));
        }
        if !errors.is_empty() {
            warn!(fields = ?errors.iter().map(|e| e.field).collect::<Vec<_>>(), "registration rejected");
            return Err(ValidationErrors(errors).into());
        }

        let hash = hash_password(password).map_err(AppError::Persistence)?;
        let id = self.users.insert(name, &email, &hash).await?;

        info!(user_id = %id, "user registered");
        Ok(Registered {
            id,
            message: format!("Registration successful! Welcome, {name}."),
        })
    }

    pub async fn verify_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserPublicView, AppError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_dummy(password);
            debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        let ok = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
            error!(error = %e, user_id = %user.id, "stored hash unreadable");
            false
        });
        if !ok {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user.into())
    }

    /// Role of the user; a store failure is returned, not swallowed.
    pub async fn lookup_role(&self, user_id: Uuid) -> Result<Option<Role>, AppError> {
        let name = self.users.role_name(user_id).await?;
        Ok(name.as_deref().map(Role::from_name))
    }

    pub async fn get_role(&self, user_id: Uuid) -> Option<Role> {
        match self.lookup_role(user_id).await {
            Ok(role) => role,
            Err(e) => {
                error!(error = %e, %user_id, "role lookup failed");
                None
            }
        }
    }

    pub async fn is_admin(&self, user_id: Uuid) -> bool {
        self.get_role(user_id).await == Some(Role::Admin)
    }

    pub async fn find_public(&self, user_id: Uuid) -> Option<UserPublicView> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => user.map(Into::into),
            Err(e) => {
                error!(error = %e, %user_id, "user lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{MemoryUserStore, ADMIN_ROLE_ID};

    fn store() -> (CredentialStore, Arc<MemoryUserStore>) {
        let mem = Arc::new(MemoryUserStore::new());
        (CredentialStore::new(mem.clone()), mem)
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict_and_creates_no_row() {
        let (creds, mem) = store();
        let first = creds
            .create_user("Alice", "alice@example.com", "secret123")
            .await
            .expect("first registration succeeds");
        assert!(first.message.contains("Alice"));

        let err = creds
            .create_user("Alice Again", "Alice@Example.com ", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(mem.len(), 1);
    }

    #[tokio::test]
    async fn malformed_email_is_field_scoped() {
        let (creds, mem) = store();
        let err = creds
            .create_user("Bob", "not-an-email", "secret123")
            .await
            .unwrap_err();
        match err {
            AppError::Validation(v) => assert!(v.has_field("email")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mem.len(), 0);
    }

    #[tokio::test]
    async fn short_password_and_blank_name_rejected() {
        let (creds, _) = store();
        let err = creds
            .create_user("   ", "bob@example.com", "short")
            .await
            .unwrap_err();
        match err {
            AppError::Validation(v) => {
                assert!(v.has_field("name"));
                assert!(v.has_field("password"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sql_metacharacters_are_stored_verbatim() {
        let (creds, _) = store();
        let email = "inject+';drop-table-users;--@example.com";
        creds
            .create_user("SQLi", email, "Password123!")
            .await
            .expect("registration succeeds");
        let user = creds.verify_login(email, "Password123!").await.unwrap();
        assert_eq!(user.email, email);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (creds, _) = store();
        creds
            .create_user("Alice", "alice@example.com", "secret123")
            .await
            .unwrap();

        let wrong_password = creds
            .verify_login("alice@example.com", "nope-nope")
            .await
            .unwrap_err();
        let unknown_email = creds
            .verify_login("nobody@example.com", "secret123")
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(
            wrong_password,
            AppError::Auth(AuthError::InvalidCredentials)
        ));

        let ok = creds
            .verify_login(" ALICE@example.com", "secret123")
            .await
            .expect("correct password logs in");
        assert_eq!(ok.name, "Alice");
    }

    #[tokio::test]
    async fn roles_resolve_by_join() {
        let (creds, mem) = store();
        let reg = creds
            .create_user("Coach", "coach@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(creds.get_role(reg.id).await, Some(Role::Regular));
        assert!(!creds.is_admin(reg.id).await);

        mem.set_role(reg.id, ADMIN_ROLE_ID);
        assert!(creds.is_admin(reg.id).await);
        assert_eq!(creds.get_role(Uuid::new_v4()).await, None);
    }
}
