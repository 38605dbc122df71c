use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::User;
use crate::validation::{
    empty_string_as_none, normalize_isbn, parse_published_date, validate_isbn,
    validate_published_date,
};

/// A book record in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    #[schema(example = "The Left Hand of Darkness")]
    pub title: String,
    #[schema(example = "Ursula K. Le Guin")]
    pub author: String,
    #[schema(example = "1969-03-01")]
    pub published_date: Option<NaiveDate>,
    #[schema(example = "9780441478125")]
    pub isbn: Option<String>,
    /// Owner; the only user allowed to change or delete the record
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a book's owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookOwner {
    #[schema(example = "Ada")]
    pub name: String,
    #[schema(example = "reader@example.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for BookOwner {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// A book together with its owner, returned by single-book reads and updates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookWithOwner {
    #[serde(flatten)]
    pub book: Book,
    pub user: BookOwner,
}

/// Response body of the catalog listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookList {
    pub count: usize,
    pub books: Vec<Book>,
}

/// Data needed to add a book to the catalog
///
/// Used for POST /api/books. The owner is the authenticated caller.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Title cannot be empty"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    #[schema(example = "The Left Hand of Darkness")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Author cannot be empty"),
        length(max = 255, message = "Author must be at most 255 characters")
    )]
    #[schema(example = "Ursula K. Le Guin")]
    pub author: Option<String>,

    #[serde(default, alias = "publishedDate", deserialize_with = "empty_string_as_none")]
    #[validate(custom = "validate_published_date")]
    #[schema(example = "1969-03-01")]
    pub published_date: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom = "validate_isbn")]
    #[schema(example = "9780441478125")]
    pub isbn: Option<String>,
}

/// Partial update of a book; absent and empty fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 255, message = "Author must be at most 255 characters"))]
    pub author: Option<String>,

    #[serde(default, alias = "publishedDate", deserialize_with = "empty_string_as_none")]
    #[validate(custom = "validate_published_date")]
    pub published_date: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom = "validate_isbn")]
    pub isbn: Option<String>,
}

impl UpdateBook {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.published_date.is_none()
            && self.isbn.is_none()
    }
}

/// Validated insert for the book store
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub published_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub user_id: Uuid,
}

/// Validated changes for the book store; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub isbn: Option<String>,
}

impl BookChanges {
    /// Apply onto an existing record
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(date) = self.published_date {
            book.published_date = Some(date);
        }
        if let Some(isbn) = self.isbn {
            book.isbn = Some(isbn);
        }
    }
}

impl From<UpdateBook> for BookChanges {
    fn from(update: UpdateBook) -> Self {
        Self {
            title: update.title,
            author: update.author,
            published_date: update.published_date.as_deref().and_then(parse_published_date),
            isbn: update.isbn.as_deref().map(normalize_isbn),
        }
    }
}
