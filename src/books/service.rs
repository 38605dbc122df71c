// Catalog operations with ownership rules

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, UserStore};
use crate::books::{
    models::{Book, BookChanges, BookList, BookWithOwner, CreateBook, NewBook, UpdateBook},
    repository::{isbn_conflict, BookStore},
};
use crate::error::ApiError;
use crate::validation::{normalize_isbn, parse_published_date};

fn book_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound {
        resource: "Book".to_string(),
        id: id.to_string(),
    }
}

pub struct BookService {
    books: Arc<dyn BookStore>,
    users: Arc<dyn UserStore>,
}

impl BookService {
    pub fn new(books: Arc<dyn BookStore>, users: Arc<dyn UserStore>) -> Self {
        Self { books, users }
    }

    pub async fn list(&self) -> Result<BookList, ApiError> {
        let books = self.books.list().await?;
        Ok(BookList {
            count: books.len(),
            books,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<BookWithOwner, ApiError> {
        let book = self.books.find_by_id(id).await?.ok_or_else(|| book_not_found(id))?;
        self.with_owner(book).await
    }

    /// Add a book owned by the caller
    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        request: CreateBook,
    ) -> Result<Book, ApiError> {
        request.validate()?;
        let (title, author) = match (request.title, request.author) {
            (Some(title), Some(author)) => (title, author),
            _ => return Err(ApiError::InternalError("validated book is missing a field".into())),
        };

        let isbn = request.isbn.as_deref().map(normalize_isbn);
        if let Some(isbn) = isbn.as_deref() {
            if self.books.isbn_taken(isbn, None).await? {
                debug!("Attempt to create book with duplicate ISBN: {}", isbn);
                return Err(isbn_conflict(isbn));
            }
        }

        let book = self
            .books
            .insert(NewBook {
                title,
                author,
                published_date: request.published_date.as_deref().and_then(parse_published_date),
                isbn,
                user_id: caller.user_id,
            })
            .await?;

        info!(book_id = %book.id, user_id = %caller.user_id, "book created");
        Ok(book)
    }

    /// Checks run in order: body validity, something to change, existence,
    /// ownership, ISBN uniqueness
    pub async fn update(
        &self,
        caller: &AuthenticatedUser,
        id: Uuid,
        request: UpdateBook,
    ) -> Result<BookWithOwner, ApiError> {
        request.validate()?;
        if request.is_empty() {
            return Err(ApiError::BadRequest(
                "At least one field must be provided".to_string(),
            ));
        }

        let existing = self.books.find_by_id(id).await?.ok_or_else(|| book_not_found(id))?;
        caller.ensure_owns(existing.user_id)?;

        let changes = BookChanges::from(request);
        if let Some(isbn) = changes.isbn.as_deref() {
            if self.books.isbn_taken(isbn, Some(id)).await? {
                debug!("Attempt to update book {} to duplicate ISBN: {}", id, isbn);
                return Err(isbn_conflict(isbn));
            }
        }

        let updated = self
            .books
            .update(id, changes)
            .await?
            .ok_or_else(|| book_not_found(id))?;

        info!(book_id = %id, "book updated");
        self.with_owner(updated).await
    }

    pub async fn delete(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<(), ApiError> {
        let existing = self.books.find_by_id(id).await?.ok_or_else(|| book_not_found(id))?;
        caller.ensure_owns(existing.user_id)?;

        if !self.books.delete(id).await? {
            return Err(book_not_found(id));
        }

        info!(book_id = %id, "book deleted");
        Ok(())
    }

    async fn with_owner(&self, book: Book) -> Result<BookWithOwner, ApiError> {
        let owner = self.users.find_by_id(book.user_id).await?.ok_or_else(|| {
            ApiError::InternalError(format!("owner {} of book {} is missing", book.user_id, book.id))
        })?;

        Ok(BookWithOwner {
            book,
            user: owner.into(),
        })
    }
}
