// Authentication module
// Email/password signup and login, HS256 session tokens, and the request gate

pub mod error;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use gate::{authorize, AuthGate, DenyReason, GateDecision};
pub use handlers::{login_handler, me_handler, signup_handler};
pub use middleware::{AuthenticatedUser, Identity};
pub use models::{AuthResponse, LoginRequest, SignupRequest, User, UserResponse};
pub use password::{CredentialError, PasswordService};
pub use repository::{PgUserStore, UserStore};
pub use service::AuthService;
pub use token::TokenService;
