//! Authorization checks gating the mutation endpoints.
//!
//! Creation of recipes and workouts is reserved to admins; editing and
//! deleting is reserved to the owner, with no role override.

use uuid::Uuid;

use crate::auth::repo_types::Role;
use crate::auth::services::CredentialStore;
use crate::error::{AppError, AuthError};
use crate::session::Session;

/// A resource with exactly one owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

pub fn require_authenticated(session: &Session) -> Result<Uuid, AuthError> {
    session.user_id().ok_or(AuthError::Unauthenticated)
}

/// A failed role lookup surfaces as the store error rather than a role denial.
pub async fn require_admin(credentials: &CredentialStore, user_id: Uuid) -> Result<(), AppError> {
    match credentials.lookup_role(user_id).await? {
        Some(Role::Admin) => Ok(()),
        _ => Err(AuthError::InsufficientRole.into()),
    }
}

/// Authenticated and admin, as required by the creation flows.
pub async fn require_admin_session(
    credentials: &CredentialStore,
    session: &Session,
) -> Result<Uuid, AppError> {
    let user_id = require_authenticated(session)?;
    require_admin(credentials, user_id).await?;
    Ok(user_id)
}

pub fn require_owner<R: Owned + ?Sized>(resource: &R, user_id: Uuid) -> Result<(), AuthError> {
    if resource.owner_id() == user_id {
        Ok(())
    } else {
        Err(AuthError::NotOwner)
    }
}
