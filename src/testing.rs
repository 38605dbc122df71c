// In-memory collaborators for tests

use std::sync::{Arc, Mutex};

use axum::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{NewUser, User},
    password::cheap_password_config,
    UserStore,
};
use crate::books::{
    models::{Book, BookChanges, NewBook},
    repository::isbn_conflict,
    BookStore,
};
use crate::db::Probe;
use crate::error::ApiError;
use crate::AppState;

pub const TEST_JWT_SECRET: &[u8] = b"integration_test_secret_0123456789abcdef";

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailAlreadyExists);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct InMemoryBooks {
    books: Mutex<Vec<Book>>,
}

impl InMemoryBooks {
    fn isbn_in_use(books: &[Book], isbn: &str, excluding: Option<Uuid>) -> bool {
        books
            .iter()
            .any(|b| b.isbn.as_deref() == Some(isbn) && Some(b.id) != excluding)
    }
}

#[async_trait]
impl BookStore for InMemoryBooks {
    async fn list(&self) -> Result<Vec<Book>, ApiError> {
        Ok(self.books.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, ApiError> {
        let books = self.books.lock().unwrap();
        Ok(books.iter().find(|b| b.id == id).cloned())
    }

    async fn isbn_taken(&self, isbn: &str, excluding: Option<Uuid>) -> Result<bool, ApiError> {
        let books = self.books.lock().unwrap();
        Ok(Self::isbn_in_use(&books, isbn, excluding))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, ApiError> {
        let mut books = self.books.lock().unwrap();
        if let Some(isbn) = book.isbn.as_deref() {
            if Self::isbn_in_use(&books, isbn, None) {
                return Err(isbn_conflict(isbn));
            }
        }

        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            published_date: book.published_date,
            isbn: book.isbn,
            user_id: book.user_id,
            created_at: now,
            updated_at: now,
        };
        books.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: Uuid, changes: BookChanges) -> Result<Option<Book>, ApiError> {
        let mut books = self.books.lock().unwrap();
        if let Some(isbn) = changes.isbn.as_deref() {
            if Self::isbn_in_use(&books, isbn, Some(id)) {
                return Err(isbn_conflict(isbn));
            }
        }

        Ok(books.iter_mut().find(|b| b.id == id).map(|book| {
            changes.apply(book);
            book.updated_at = Utc::now();
            book.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != id);
        Ok(books.len() < before)
    }
}

/// Probe with a fixed answer
pub struct StaticProbe(pub bool);

#[async_trait]
impl Probe for StaticProbe {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.0 {
            Ok(())
        } else {
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// Application state over fresh in-memory stores
pub fn test_state(database_up: bool) -> AppState {
    AppState::from_parts(
        Arc::new(InMemoryUsers::default()),
        Arc::new(InMemoryBooks::default()),
        Arc::new(StaticProbe(database_up)),
        TEST_JWT_SECRET,
        cheap_password_config(),
    )
    .unwrap()
}
