use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub role_id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never rendered
    pub created_at: OffsetDateTime,
}

/// Closed set of roles; anything that is not `admin` is treated as regular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Regular,
}

impl Role {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Regular
        }
    }
}
