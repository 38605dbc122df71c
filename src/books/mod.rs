// Book catalog: public reads, owner-only changes

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{Book, BookList, BookOwner, BookWithOwner, CreateBook, UpdateBook};
pub use repository::{BookStore, PgBookStore};
pub use service::BookService;
