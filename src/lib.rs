//! # Shelf
//!
//! This crate is the backend of a personal book tracker. It stores books with
//! optional cover images, and per-book memories (free-text notes) and quotes.
//!
//! ## Features
//!
//! - **Books**: Create, update, search and delete books. Searching filters by
//!   title/author substring, genre tag and read status while keeping the
//!   rating order.
//! - **Cover Images**: Accept uploaded JPEG/PNG covers or fetch them from
//!   allow-listed hosts, confined to a single managed directory.
//! - **Memories and Quotes**: Attach notes and passages to a book.
//! - **Batch Import**: Create many books in one transaction.
//!
//! ## Usage
//!
//! Books are created through [`CreateBookCommand`](app::CreateBookCommand),
//! which acquires the cover and inserts the record.
//!
//! ```no_run
//! use shelf::app::CreateBookCommand;
//! use shelf::cover::CoverStorage;
//! use shelf::database::Database;
//! use shelf::model::BookFields;
//!
//! async fn add_dune(storage: &CoverStorage, db: &Database) {
//!     let mut fields = BookFields::new("Dune");
//!     fields.author = Some("Frank Herbert".to_string());
//!     fields.genre = Some("Sci-Fi, Classic".to_string());
//!
//!     let command = CreateBookCommand::new(fields)
//!         .with_cover_url("https://covers.openlibrary.org/b/isbn/9780441013593-M.jpg");
//!
//!     match command.execute(storage, db).await {
//!         Ok(book) => println!("created book {}", book.id),
//!         Err(error) => eprintln!("failed to create book: {}", error),
//!     }
//! }
//! ```

pub mod app;
pub mod config;
pub mod cover;
pub mod database;
mod dialect;
pub mod logging;
pub mod model;
pub mod query;

/// Commonly used types, for `use shelf::prelude::*`.
pub mod prelude {
    pub use crate::app::{AppError, CreateBookCommand, UpdateBookCommand};
    pub use crate::config::Config;
    pub use crate::cover::CoverStorage;
    pub use crate::database::Database;
    pub use crate::model::{Book, BookFields, BookId, Memory, MemoryId, NewBook, Quote, QuoteId};
    pub use crate::query::BookQuery;
}
