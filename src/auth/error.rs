// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::password::CredentialError;
use crate::error::ErrorResponse;

/// Authentication and authorization error types
#[derive(Debug, Error)]
pub enum AuthError {
    // Client errors
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid user password")]
    InvalidCredentials,

    #[error("User not exists")]
    UnknownUser,

    #[error("User already exists")]
    EmailAlreadyExists,

    #[error("Missing authorization header")]
    MissingToken,

    /// Bad signature, wrong algorithm, expired, malformed or subject-less.
    /// Deliberately a single variant so responses never reveal which step failed.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Identity does not own this resource")]
    NotOwner,

    // Server errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::UnknownUser => StatusCode::NOT_FOUND,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::NotOwner => StatusCode::FORBIDDEN,
            AuthError::Credential(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to send to clients (no internal detail)
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Validation(_) => "Validation failed".to_string(),
            AuthError::InvalidCredentials => "Invalid user password".to_string(),
            AuthError::UnknownUser => "User not exists".to_string(),
            AuthError::EmailAlreadyExists => "User already exists".to_string(),
            AuthError::MissingToken => "Unauthorized or missing Authorization header".to_string(),
            AuthError::InvalidToken => "Unauthorized or invalid token".to_string(),
            AuthError::NotOwner => "You are not authorized to modify this resource".to_string(),
            AuthError::Credential(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                "UNAUTHORIZED"
            }
            AuthError::UnknownUser => "NOT_FOUND",
            AuthError::EmailAlreadyExists => "CONFLICT",
            AuthError::NotOwner => "FORBIDDEN",
            AuthError::Credential(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::MissingToken => warn!("Missing token in request"),
            AuthError::InvalidToken => warn!("Invalid or expired token attempt"),
            AuthError::InvalidCredentials => warn!("Failed login attempt"),
            AuthError::NotOwner => warn!("Ownership check failed"),
            AuthError::Credential(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => error!("Auth failure: {}", self),
            _ => {}
        }

        let mut body = ErrorResponse::new(self.error_code(), self.client_message());
        if let AuthError::Validation(errors) = &self {
            body = body.with_details(serde_json::to_value(errors).unwrap_or(serde_json::json!({})));
        }

        (self.status_code(), Json(body)).into_response()
    }
}
