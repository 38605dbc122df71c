// HTTP handlers for the book catalog

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::books::{
    models::{Book, BookList, BookWithOwner, CreateBook, UpdateBook},
    service::BookService,
};
use crate::error::{ApiError, ApiJson};

/// Handler for GET /api/books
#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "Every book in the catalog", body = BookList),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    ),
    tag = "books"
)]
pub async fn list_books(
    State(service): State<Arc<BookService>>,
) -> Result<Json<BookList>, ApiError> {
    tracing::debug!("Fetching all books");
    Ok(Json(service.list().await?))
}

/// Handler for GET /api/books/:id
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book found", body = BookWithOwner),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    ),
    tag = "books"
)]
pub async fn get_book(
    State(service): State<Arc<BookService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookWithOwner>, ApiError> {
    tracing::debug!("Fetching book with id: {}", id);
    Ok(Json(service.get(id).await?))
}

/// Handler for POST /api/books
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input data", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already used", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn create_book(
    State(service): State<Arc<BookService>>,
    user: AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = service.create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Handler for PUT /api/books/:id
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookWithOwner),
        (status = 400, description = "Invalid input or nothing to update", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller does not own the book", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already used", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn update_book(
    State(service): State<Arc<BookService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateBook>,
) -> Result<Json<BookWithOwner>, ApiError> {
    Ok(Json(service.update(&user, id, payload).await?))
}

/// Handler for DELETE /api/books/:id
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller does not own the book", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn delete_book(
    State(service): State<Arc<BookService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
