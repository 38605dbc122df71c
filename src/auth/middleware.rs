// Identity attached to requests by the authorization gate

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::auth::error::AuthError;

/// Caller resolved by the gate for the duration of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(AuthenticatedUser),
}

/// Authenticated user extractor for protected routes
///
/// Reads the identity the gate stored in the request extensions. Tokens are
/// never verified a second time here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

impl AuthenticatedUser {
    /// Ownership check against a resource's recorded owner
    pub fn ensure_owns(&self, owner_id: Uuid) -> Result<(), AuthError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, %owner_id, "ownership check failed");
            Err(AuthError::NotOwner)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::User(user)) => Ok(user.clone()),
            Some(Identity::Anonymous) => Err(AuthError::MissingToken),
            None => {
                // Route mounted without the gate in front of it
                warn!(path = %parts.uri.path(), "no identity attached to request");
                Err(AuthError::MissingToken)
            }
        }
    }
}
