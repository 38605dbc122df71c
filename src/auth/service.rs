// Authentication service - business logic layer

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, LoginRequest, NewUser, SignupRequest, User, UserResponse},
    password::PasswordService,
    repository::UserStore,
    token::{IdentityClaims, TokenService},
};

/// Authentication service coordinating signup, login and identity lookup
pub struct AuthService {
    users: Arc<dyn UserStore>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new user and sign them in
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        request.validate()?;
        let (email, password, name) = match (request.email, request.password, request.name) {
            (Some(email), Some(password), Some(name)) => (email, password, name),
            _ => return Err(AuthError::Internal("validated signup is missing a field".into())),
        };

        if self.users.find_by_email(&email).await?.is_some() {
            debug!("signup rejected: email already registered");
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = self.passwords.hash(password).await?;
        let user = self
            .users
            .insert(NewUser {
                email,
                name,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.session_for(user)
    }

    /// Check credentials and issue a fresh session token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        request.validate()?;
        let (email, password) = match (request.email, request.password) {
            (Some(email), Some(password)) => (email, password),
            _ => return Err(AuthError::Internal("validated login is missing a field".into())),
        };

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        if !self
            .passwords
            .verify(password, user.password_hash.clone())
            .await?
        {
            warn!(user_id = %user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.session_for(user)
    }

    /// Profile of the user bound to the current request
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserResponse, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UnknownUser)
    }

    fn session_for(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.tokens.issue(&IdentityClaims {
            user_id: user.id,
            email: user.email.clone(),
        })?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }
}
