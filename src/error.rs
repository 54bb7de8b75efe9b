//! Error kinds shared by the stores, services and handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    #[cfg(test)]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("You must be authenticated to do that.")]
    Unauthenticated,
    #[error("You do not have the role required for this action.")]
    InsufficientRole,
    #[error("You are not the owner of this item.")]
    NotOwner,
    #[error("Invalid email or password.")]
    InvalidCredentials,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("{0}")]
    NotFound(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                return AppError::Conflict("This record already exists.".into());
            }
        }
        AppError::Persistence(e.into())
    }
}

impl AppError {
    /// Text safe to show the end user; infrastructure failures are logged and masked.
    pub fn flash_message(&self) -> String {
        match self {
            AppError::Persistence(e) => {
                error!(error = %e, "persistence failure");
                GENERIC_FAILURE.to_string()
            }
            other => other.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::Unauthenticated | AuthError::InvalidCredentials) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, self.flash_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_errors_are_masked() {
        let err = AppError::Persistence(anyhow::anyhow!("relation \"users\" does not exist"));
        assert_eq!(err.flash_message(), GENERIC_FAILURE);
    }

    #[test]
    fn validation_message_joins_fields() {
        let err = AppError::from(ValidationErrors(vec![
            FieldError::new("title", "Title is required."),
            FieldError::new("date", "Date must be YYYY-MM-DD."),
        ]));
        assert_eq!(
            err.flash_message(),
            "Title is required. Date must be YYYY-MM-DD."
        );
    }

    #[test]
    fn auth_messages_are_distinct() {
        let msgs = [
            AuthError::Unauthenticated.to_string(),
            AuthError::InsufficientRole.to_string(),
            AuthError::NotOwner.to_string(),
        ];
        assert_ne!(msgs[0], msgs[1]);
        assert_ne!(msgs[1], msgs[2]);
        assert_ne!(msgs[0], msgs[2]);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Auth(AuthError::NotOwner).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("dup".into()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
