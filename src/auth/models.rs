// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::empty_string_as_none;

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User response model (excludes password_hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "reader@example.com")]
    pub email: String,
    #[schema(example = "Ada")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

/// Row to insert on signup; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Signup request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Email cannot be empty"),
        email(message = "Invalid email format")
    )]
    #[schema(example = "reader@example.com")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Password cannot be empty"),
        length(min = 6, message = "Password must be at least 6 characters long")
    )]
    #[schema(example = "secret1")]
    pub password: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Name cannot be empty"))]
    #[schema(example = "Ada")]
    pub name: Option<String>,
}

/// Login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email format")
    )]
    #[schema(example = "reader@example.com")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Password is required"))]
    #[schema(example = "secret1")]
    pub password: Option<String>,
}

/// Authentication response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// HS256 bearer token, valid for two hours
    pub token: String,
    pub user: UserResponse,
}
