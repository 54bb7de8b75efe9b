use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Form body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub csrf_token: Option<String>,
}

/// Form body for login.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub csrf_token: Option<String>,
}

/// Form body carrying only the anti-forgery token (logout, delete).
#[derive(Debug, Deserialize)]
pub struct TokenOnlyForm {
    pub csrf_token: Option<String>,
}

/// Result of a successful registration.
#[derive(Debug, Serialize)]
pub struct Registered {
    pub id: Uuid,
    pub message: String,
}

/// User without the password hash.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserPublicView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: i32,
}

impl From<User> for UserPublicView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role_id: u.role_id,
        }
    }
}
