//! # Book Services
//!
//! This module orchestrates the [`Database`], the [`CoverStorage`] and the query
//! engine to implement every use case around books. Memories and quotes live in
//! the [`memory`] and [`quote`] submodules.
//!
//! ## Provided Structures
//!
//! - **CreateBookCommand**: Builds and executes the creation of a single book,
//!   optionally acquiring a cover from an upload or an allow-listed URL.
//! - **UpdateBookCommand**: Overwrites every descriptive field of an existing
//!   book and, when asked, replaces its cover.
//!
//! ## Core Asynchronous Functions
//!
//! - **create_books**: Imports a batch of books in one transaction, covers
//!   taken from URLs only.
//! - **find_book**, **search_books**, **list_genres**: Read access, with the
//!   in-memory filtering of [`crate::query`].
//! - **delete_book**: Removes a book, its cover file, memories and quotes.
//!
//! ## Cover Policy
//!
//! An upload always wins over a URL. An upload that fails validation fails the
//! whole operation, while a URL that cannot be fetched merely leaves the book
//! without a cover. On update, a URL is only applied when the book has no
//! cover yet; it never replaces an existing one.
//!
//! ## Error Handling
//!
//! [`AppError`] wraps cover and database errors and adds validation and
//! not-found variants.

pub mod memory;
pub mod quote;

use crate::{
    cover::{CoverError, CoverStorage},
    database::{Database, DatabaseError},
    model::{Book, BookFields, BookId, CoverUpload, MAX_TEXT_LEN, MemoryId, NewBook, QuoteId},
    query::{BookQuery, distinct_genres, filter_books},
};
use futures::future::join_all;
use tracing::{info, warn};

/// Represents a command for creating a single book.
///
/// Use the builder-style methods (`with_cover_upload`, `with_cover_url`) to
/// attach a cover source before calling `execute()`.
#[derive(Debug, Clone)]
pub struct CreateBookCommand {
    /// Descriptive fields of the new book.
    pub fields: BookFields,
    /// An uploaded cover; takes precedence over `cover_url`.
    pub cover_upload: Option<CoverUpload>,
    /// A remote cover, only fetched from allow-listed hosts.
    pub cover_url: Option<String>,
}

impl CreateBookCommand {
    /// Creates a new `CreateBookCommand` with the given fields and no cover.
    pub fn new(fields: BookFields) -> Self {
        CreateBookCommand {
            fields,
            cover_upload: None,
            cover_url: None,
        }
    }

    /// Attaches an uploaded cover. An empty upload counts as no upload.
    pub fn with_cover_upload(mut self, upload: CoverUpload) -> Self {
        self.cover_upload = Some(upload);
        self
    }

    /// Attaches a remote cover URL. An empty URL counts as no URL.
    pub fn with_cover_url<T: Into<String>>(mut self, url: T) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    /// Executes the creation of the book.
    ///
    /// The fields are validated first, then the cover is acquired, then the
    /// record is inserted. If the insert fails, the freshly written cover file
    /// is removed again.
    ///
    /// # Arguments
    ///
    /// * `storage` - Cover storage the cover file is written to.
    /// * `db` - Database the book is inserted into.
    ///
    /// # Returns
    ///
    /// Returns the stored `Book`, or an `AppError` on validation, upload or
    /// database failure.
    pub async fn execute(self, storage: &CoverStorage, db: &Database) -> Result<Book, AppError> {
        validate_book_fields(&self.fields)?;

        let cover = match supplied_upload(self.cover_upload.as_ref()) {
            Some(upload) => Some(storage.save_upload(upload)?),
            None => match supplied_url(self.cover_url.as_deref()) {
                Some(url) => storage.download(url).await,
                None => None,
            },
        };

        match db.insert_book(&self.fields, cover.as_deref()).await {
            Ok(book) => {
                info!(id = %book.id, title = %book.title, "created book");
                Ok(book)
            }
            Err(e) => {
                storage.delete(cover.as_deref());
                Err(e.into())
            }
        }
    }
}

/// Represents a command for overwriting an existing book.
///
/// There are no patch semantics: every field of `fields` replaces the stored
/// value, an absent one clears it.
#[derive(Debug, Clone)]
pub struct UpdateBookCommand {
    pub id: BookId,
    pub fields: BookFields,
    pub cover_upload: Option<CoverUpload>,
    pub cover_url: Option<String>,
}

impl UpdateBookCommand {
    pub fn new(id: BookId, fields: BookFields) -> Self {
        UpdateBookCommand {
            id,
            fields,
            cover_upload: None,
            cover_url: None,
        }
    }

    /// Attaches an uploaded cover that replaces the current one.
    pub fn with_cover_upload(mut self, upload: CoverUpload) -> Self {
        self.cover_upload = Some(upload);
        self
    }

    /// Attaches a remote cover URL, applied only if the book has no cover yet.
    pub fn with_cover_url<T: Into<String>>(mut self, url: T) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    /// Executes the update.
    ///
    /// A new upload is written before the previous cover file is removed, and
    /// the previous file is only removed once the record points at the new
    /// one.
    ///
    /// # Returns
    ///
    /// Returns the updated `Book`, or `AppError::BookNotFound` if no book has
    /// the given id.
    pub async fn execute(self, storage: &CoverStorage, db: &Database) -> Result<Book, AppError> {
        validate_book_fields(&self.fields)?;

        let mut book = db
            .get_book(self.id)
            .await?
            .ok_or(AppError::BookNotFound { id: self.id })?;

        let previous_cover = book.cover_image_path.clone();
        book.overwrite(self.fields);

        let mut replaced_cover = None;
        if let Some(upload) = supplied_upload(self.cover_upload.as_ref()) {
            book.cover_image_path = Some(storage.save_upload(upload)?);
            replaced_cover = previous_cover.clone();
        } else if book.cover_image_path.is_none() {
            if let Some(url) = supplied_url(self.cover_url.as_deref()) {
                book.cover_image_path = storage.download(url).await;
            }
        }

        if let Err(e) = db.update_book(&book).await {
            if book.cover_image_path != previous_cover {
                storage.delete(book.cover_image_path.as_deref());
            }
            return Err(e.into());
        }

        storage.delete(replaced_cover.as_deref());
        info!(id = %book.id, title = %book.title, "updated book");

        Ok(book)
    }
}

/// Creates a batch of books in a single transaction.
///
/// Covers can only come from URLs here. Downloads run concurrently, and a
/// cover that cannot be fetched leaves its book without one. If the
/// transaction fails, every downloaded cover is removed again.
///
/// # Arguments
///
/// * `storage` - Cover storage downloaded covers are written to.
/// * `db` - Database the books are inserted into.
/// * `entries` - The books to create, in order.
///
/// # Returns
///
/// Returns the created books in input order. Nothing is stored if any entry
/// fails validation.
pub async fn create_books(
    storage: &CoverStorage,
    db: &Database,
    entries: Vec<NewBook>,
) -> Result<Vec<Book>, AppError> {
    for entry in &entries {
        validate_book_fields(&entry.fields)?;
    }

    let covers = join_all(entries.iter().map(|entry| async move {
        match supplied_url(entry.cover_image_url.as_deref()) {
            Some(url) => storage.download(url).await,
            None => None,
        }
    }))
    .await;

    let rows: Vec<(BookFields, Option<String>)> = entries
        .into_iter()
        .map(|entry| entry.fields)
        .zip(covers)
        .collect();

    match db.insert_books(&rows).await {
        Ok(books) => {
            info!(count = books.len(), "created books");
            Ok(books)
        }
        Err(e) => {
            warn!(error = %e, "batch insert failed, removing downloaded covers");
            for (_, cover) in &rows {
                storage.delete(cover.as_deref());
            }
            Err(e.into())
        }
    }
}

/// Retrieves a single book by id.
pub async fn find_book(db: &Database, id: BookId) -> Result<Book, AppError> {
    db.get_book(id)
        .await?
        .ok_or(AppError::BookNotFound { id })
}

/// Lists the books matching `query`, highest rated first and unrated books last.
pub async fn search_books(db: &Database, query: &BookQuery) -> Result<Vec<Book>, AppError> {
    let books = db.list_books_by_rating().await?;

    Ok(filter_books(books, query))
}

/// Lists every distinct genre tag across all books, sorted ascending.
pub async fn list_genres(db: &Database) -> Result<Vec<String>, AppError> {
    let books = db.list_books().await?;

    Ok(distinct_genres(&books))
}

/// Completely removes a book.
///
/// The cover file is removed first (best-effort), then the record together
/// with its memories and quotes.
///
/// # Returns
///
/// Returns `AppError::BookNotFound` if no book has the given id.
pub async fn delete_book(storage: &CoverStorage, db: &Database, id: BookId) -> Result<(), AppError> {
    let book = find_book(db, id).await?;

    storage.delete(book.cover_image_path.as_deref());
    db.delete_book(id).await?;
    info!(%id, title = %book.title, "deleted book");

    Ok(())
}

fn supplied_upload(upload: Option<&CoverUpload>) -> Option<&CoverUpload> {
    upload.filter(|u| !u.is_empty())
}

fn supplied_url(url: Option<&str>) -> Option<&str> {
    url.filter(|u| !u.is_empty())
}

fn validate_book_fields(fields: &BookFields) -> Result<(), AppError> {
    if fields.title.trim().is_empty() {
        return Err(AppError::Validation {
            field: "title",
            message: "must not be blank".to_string(),
        });
    }

    if let Some(notes) = &fields.notes {
        validate_length("notes", notes)?;
    }

    Ok(())
}

/// Checks the content of a memory or quote.
pub(crate) fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation {
            field: "content",
            message: "must not be blank".to_string(),
        });
    }

    validate_length("content", content)
}

fn validate_length(field: &'static str, value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(AppError::Validation {
            field,
            message: format!("is {len} characters long, at most {MAX_TEXT_LEN} are allowed"),
        });
    }

    Ok(())
}

/// Error types within the application, encapsulating cover, database, validation
/// and not-found errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("cover error: {0}")]
    Cover(#[from] CoverError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("book not found: {id}")]
    BookNotFound { id: BookId },

    #[error("memory not found: {id}")]
    MemoryNotFound { id: MemoryId },

    #[error("quote not found: {id}")]
    QuoteNotFound { id: QuoteId },
}
