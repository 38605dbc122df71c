// Bookshelf API: book catalog with email/password auth

pub mod auth;
pub mod books;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod validation;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    authorize, AuthGate, AuthService, CredentialError, PasswordService, PgUserStore, TokenService,
    UserStore,
};
use books::{BookService, BookStore, PgBookStore};
use config::{AppConfig, PasswordConfig};
use db::Probe;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::signup_handler,
        auth::handlers::login_handler,
        auth::handlers::me_handler,
        books::handlers::list_books,
        books::handlers::get_book,
        books::handlers::create_book,
        books::handlers::update_book,
        books::handlers::delete_book,
        health::health_check,
    ),
    components(schemas(
        auth::models::SignupRequest,
        auth::models::LoginRequest,
        auth::models::AuthResponse,
        auth::models::UserResponse,
        books::models::Book,
        books::models::BookOwner,
        books::models::BookWithOwner,
        books::models::BookList,
        books::models::CreateBook,
        books::models::UpdateBook,
        health::HealthResponse,
        health::DatabaseStatus,
        error::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and the current user"),
        (name = "books", description = "Book catalog; reads are public, changes need a bearer token"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "Book catalog with email/password authentication"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
///
/// Everything in here is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub books: Arc<BookService>,
    pub gate: Arc<AuthGate>,
    pub probe: Arc<dyn Probe>,
}

impl AppState {
    /// Postgres-backed state for the running server
    pub fn new(pool: PgPool, config: &AppConfig) -> Result<Self, CredentialError> {
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
        let books: Arc<dyn BookStore> = Arc::new(PgBookStore::new(pool.clone()));
        let probe: Arc<dyn Probe> = Arc::new(pool);

        Self::from_parts(users, books, probe, config.jwt_secret.as_bytes(), config.password)
    }

    /// Assemble state from explicit collaborators
    pub fn from_parts(
        users: Arc<dyn UserStore>,
        books: Arc<dyn BookStore>,
        probe: Arc<dyn Probe>,
        jwt_secret: &[u8],
        password: PasswordConfig,
    ) -> Result<Self, CredentialError> {
        let tokens = Arc::new(TokenService::new(jwt_secret));
        let passwords = PasswordService::new(password)?;

        Ok(Self {
            auth: Arc::new(AuthService::new(users.clone(), passwords, tokens.clone())),
            books: Arc::new(BookService::new(books, users)),
            gate: Arc::new(AuthGate::new(tokens)),
            probe,
        })
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<BookService> {
    fn from_ref(state: &AppState) -> Self {
        state.books.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Probe> {
    fn from_ref(state: &AppState) -> Self {
        state.probe.clone()
    }
}

/// Creates and configures the application router
///
/// Book and user routes sit behind the authorization gate; the gate itself
/// lets anonymous book reads through.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gated = Router::new()
        .route(
            "/api/books",
            get(books::handlers::list_books).post(books::handlers::create_book),
        )
        .route(
            "/api/books/:id",
            get(books::handlers::get_book)
                .put(books::handlers::update_book)
                .delete(books::handlers::delete_book),
        )
        .route("/api/user/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), authorize));

    let open = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/health", get(health::health_check));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(gated)
        .merge(open)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
