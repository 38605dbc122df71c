// Book storage capability and its Postgres implementation

use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::books::models::{Book, BookChanges, NewBook};
use crate::error::ApiError;

const BOOK_COLUMNS: &str =
    "id, title, author, published_date, isbn, user_id, created_at, updated_at";

#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, oldest first
    async fn list(&self) -> Result<Vec<Book>, ApiError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, ApiError>;

    /// Whether another book already uses this ISBN
    async fn isbn_taken(&self, isbn: &str, excluding: Option<Uuid>) -> Result<bool, ApiError>;

    async fn insert(&self, book: NewBook) -> Result<Book, ApiError>;

    /// Returns `None` when the book does not exist
    async fn update(&self, id: Uuid, changes: BookChanges) -> Result<Option<Book>, ApiError>;

    /// Returns `false` when there was nothing to delete
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;
}

pub(crate) fn isbn_conflict(isbn: &str) -> ApiError {
    ApiError::Conflict {
        message: format!("A book with ISBN '{}' already exists", isbn),
    }
}

/// Maps a unique violation on the ISBN index to a conflict
fn map_write_error(e: sqlx::Error, isbn: Option<&str>) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return isbn_conflict(isbn.unwrap_or_default());
        }
    }
    ApiError::from(e)
}

pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn list(&self) -> Result<Vec<Book>, ApiError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY created_at, id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Retrieved {} books", books.len());
        Ok(books)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, ApiError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn isbn_taken(&self, isbn: &str, excluding: Option<Uuid>) -> Result<bool, ApiError> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.unwrap_or(false))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, ApiError> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (id, title, author, published_date, isbn, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_date)
        .bind(&book.isbn)
        .bind(book.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, book.isbn.as_deref()))
    }

    async fn update(&self, id: Uuid, changes: BookChanges) -> Result<Option<Book>, ApiError> {
        // COALESCE keeps the stored value for every field left out of the update
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = COALESCE($1, title),
                author = COALESCE($2, author),
                published_date = COALESCE($3, published_date),
                isbn = COALESCE($4, isbn),
                updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(changes.published_date)
        .bind(&changes.isbn)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, changes.isbn.as_deref()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
