//! # SQL Dialect Module
//!
//! This module defines the `Dialect` trait, which abstracts over the differences in
//! SQL syntax across database systems. The trait provides the statements the
//! [`Database`](crate::database::Database) runs against the `books`, `memories` and
//! `quotes` tables, so that the store itself stays agnostic to the underlying engine.
//!
//! The dialect in use is chosen at compile time by feature flags. When the `sqlite`
//! feature is enabled, `CurrentDialect` is `sqlite::SqliteDialect`.

#[cfg(feature = "sqlite")]
mod sqlite;

/// The current SQL dialect used at compile time, determined by feature flags.
#[cfg(feature = "sqlite")]
pub type CurrentDialect = sqlite::SqliteDialect;

#[cfg(feature = "sqlite")]
pub type Db = sqlx::Sqlite;

#[cfg(feature = "sqlite")]
pub type CurrentRow = sqlx::sqlite::SqliteRow;

/// Columns of the `books` table written on insert and update, in bind order.
pub const BOOK_COLUMNS: &[&str] = &[
    "title",
    "author",
    "genre",
    "isbn",
    "publisher",
    "publication_year",
    "pages",
    "location",
    "read_status",
    "rating",
    "notes",
    "cover_image_path",
];

/// A trait for SQL dialects to support database-specific statement generation.
///
/// Statements are written against the generic [`placeholder`](Dialect::placeholder),
/// so a dialect only has to provide the placeholder syntax and its migration.
pub trait Dialect {
    /// Returns the SQL placeholder syntax for the given parameter index.
    ///
    /// - SQLite: `?`
    ///
    /// # Parameters
    /// - `idx`: The 1-based parameter index (used in dialects that number placeholders).
    fn placeholder(idx: usize) -> String;

    /// Returns `count` comma-separated placeholders starting at index `start`.
    fn placeholder_list(start: usize, count: usize) -> String {
        (start..start + count)
            .map(Self::placeholder)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns the SQL statement inserting a book and yielding its new id.
    ///
    /// Binds the columns of [`BOOK_COLUMNS`] in order.
    fn insert_book_statement() -> String {
        format!(
            "INSERT INTO books ({}) VALUES ({}) RETURNING id",
            BOOK_COLUMNS.join(", "),
            Self::placeholder_list(1, BOOK_COLUMNS.len())
        )
    }

    /// Returns the SQL statement overwriting every column of a book.
    ///
    /// Binds the columns of [`BOOK_COLUMNS`] in order, then the id.
    fn update_book_statement() -> String {
        let assignments = BOOK_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = {}", column, Self::placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE books SET {} WHERE id = {}",
            assignments,
            Self::placeholder(BOOK_COLUMNS.len() + 1)
        )
    }

    fn select_book_statement() -> String {
        format!("SELECT * FROM books WHERE id = {}", Self::placeholder(1))
    }

    fn exists_book_statement() -> String {
        format!(
            "SELECT EXISTS ( SELECT 1 FROM books WHERE id = {} )",
            Self::placeholder(1)
        )
    }

    /// Returns the SQL statement listing books by rating, highest first and
    /// unrated books last.
    fn list_books_by_rating_statement() -> &'static str {
        "SELECT * FROM books ORDER BY CASE WHEN rating IS NULL THEN 1 ELSE 0 END, rating DESC, id ASC"
    }

    fn list_books_statement() -> &'static str {
        "SELECT * FROM books ORDER BY id ASC"
    }

    fn delete_book_statement() -> String {
        format!("DELETE FROM books WHERE id = {}", Self::placeholder(1))
    }

    /// Returns the SQL statement removing every memory owned by a book.
    fn delete_memories_by_book_statement() -> String {
        format!(
            "DELETE FROM memories WHERE book_id = {}",
            Self::placeholder(1)
        )
    }

    /// Returns the SQL statement removing every quote owned by a book.
    fn delete_quotes_by_book_statement() -> String {
        format!("DELETE FROM quotes WHERE book_id = {}", Self::placeholder(1))
    }

    fn insert_memory_statement() -> String {
        format!(
            "INSERT INTO memories (book_id, content, created_at) VALUES ({}) RETURNING id",
            Self::placeholder_list(1, 3)
        )
    }

    fn update_memory_statement() -> String {
        format!(
            "UPDATE memories SET content = {} WHERE id = {}",
            Self::placeholder(1),
            Self::placeholder(2)
        )
    }

    fn select_memory_statement() -> String {
        format!("SELECT * FROM memories WHERE id = {}", Self::placeholder(1))
    }

    fn exists_memory_statement() -> String {
        format!(
            "SELECT EXISTS ( SELECT 1 FROM memories WHERE id = {} )",
            Self::placeholder(1)
        )
    }

    fn delete_memory_statement() -> String {
        format!("DELETE FROM memories WHERE id = {}", Self::placeholder(1))
    }

    /// Returns the SQL statement listing a book's memories, newest first.
    fn memories_by_book_statement() -> String {
        format!(
            "SELECT * FROM memories WHERE book_id = {} ORDER BY created_at DESC, id DESC",
            Self::placeholder(1)
        )
    }

    fn insert_quote_statement() -> String {
        format!(
            "INSERT INTO quotes (book_id, content, page_number, created_at) VALUES ({}) RETURNING id",
            Self::placeholder_list(1, 4)
        )
    }

    fn update_quote_statement() -> String {
        format!(
            "UPDATE quotes SET content = {}, page_number = {} WHERE id = {}",
            Self::placeholder(1),
            Self::placeholder(2),
            Self::placeholder(3)
        )
    }

    fn select_quote_statement() -> String {
        format!("SELECT * FROM quotes WHERE id = {}", Self::placeholder(1))
    }

    fn exists_quote_statement() -> String {
        format!(
            "SELECT EXISTS ( SELECT 1 FROM quotes WHERE id = {} )",
            Self::placeholder(1)
        )
    }

    fn delete_quote_statement() -> String {
        format!("DELETE FROM quotes WHERE id = {}", Self::placeholder(1))
    }

    /// Returns the SQL statement listing a book's quotes by page, quotes
    /// without a page last.
    fn quotes_by_book_statement() -> String {
        format!(
            "SELECT * FROM quotes WHERE book_id = {} ORDER BY CASE WHEN page_number IS NULL THEN 1 ELSE 0 END, page_number ASC, id ASC",
            Self::placeholder(1)
        )
    }

    /// Creates the schema if it does not exist yet.
    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error>;
}
