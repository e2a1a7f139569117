//! Domain records: books and the memories and quotes attached to them.
//!
//! Records are plain values. A [`Memory`] or [`Quote`] refers to its book by
//! [`BookId`] only; callers that need the book look it up through the
//! [`Database`](crate::database::Database) explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Read status assigned when the caller does not supply one.
pub const DEFAULT_READ_STATUS: &str = "UNREAD";

/// Upper bound (in characters) for notes, memory content and quote content.
pub const MAX_TEXT_LEN: usize = 2000;

/// Identifier of a stored book, assigned by the database on first insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(i64);

/// Identifier of a stored memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(i64);

/// Identifier of a stored quote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(i64);

impl BookId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl MemoryId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl QuoteId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for BookId {
    fn from(value: i64) -> Self {
        BookId(value)
    }
}

impl From<i64> for MemoryId {
    fn from(value: i64) -> Self {
        MemoryId(value)
    }
}

impl From<i64> for QuoteId {
    fn from(value: i64) -> Self {
        QuoteId(value)
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A book on the shelf.
///
/// `genre` follows a comma-separated multi-value convention, e.g.
/// `"Sci-Fi, Fantasy"`. `cover_image_path` is either `None` or a public path
/// of the form `/uploads/covers/<name>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub pages: Option<i32>,
    pub location: Option<String>,
    pub read_status: String,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub cover_image_path: Option<String>,
}

impl Book {
    /// Builds a book record from caller-supplied fields.
    pub fn from_fields(id: BookId, fields: BookFields, cover_image_path: Option<String>) -> Self {
        let mut book = Book {
            id,
            title: String::new(),
            author: None,
            genre: None,
            isbn: None,
            publisher: None,
            year: None,
            pages: None,
            location: None,
            read_status: DEFAULT_READ_STATUS.to_string(),
            rating: None,
            notes: None,
            cover_image_path,
        };
        book.overwrite(fields);
        book
    }

    /// Replaces every descriptive field with the given values.
    ///
    /// There are no patch semantics: a `None` clears the stored value. The
    /// identifier and cover image path are left untouched.
    pub fn overwrite(&mut self, fields: BookFields) {
        self.read_status = fields.read_status_or_default().to_string();
        self.title = fields.title;
        self.author = fields.author;
        self.genre = fields.genre;
        self.isbn = fields.isbn;
        self.publisher = fields.publisher;
        self.year = fields.year;
        self.pages = fields.pages;
        self.location = fields.location;
        self.rating = fields.rating;
        self.notes = fields.notes;
    }

    /// Splits the genre field into trimmed, non-empty tags.
    pub fn genre_tags(&self) -> impl Iterator<Item = &str> {
        self.genre
            .as_deref()
            .into_iter()
            .flat_map(|g| g.split(','))
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

/// Descriptive fields of a book as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFields {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub read_status: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookFields {
    pub fn new<T: Into<String>>(title: T) -> Self {
        BookFields {
            title: title.into(),
            ..Default::default()
        }
    }

    /// The supplied read status, or [`DEFAULT_READ_STATUS`] when absent.
    pub fn read_status_or_default(&self) -> &str {
        self.read_status.as_deref().unwrap_or(DEFAULT_READ_STATUS)
    }
}

/// One entry of a batch import: book fields plus an optional remote cover.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[serde(flatten)]
    pub fields: BookFields,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

/// An uploaded cover image as received from a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverUpload {
    pub bytes: Vec<u8>,
    /// Content type declared by the client, e.g. `image/png`.
    pub content_type: Option<String>,
    /// Filename declared by the client; only its extension is kept.
    pub filename: Option<String>,
}

impl CoverUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A free-text note attached to a book.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: MemoryId,
    #[serde(skip_serializing)]
    pub book_id: BookId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A quoted passage from a book, optionally with the page it appears on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    #[serde(skip_serializing)]
    pub book_id: BookId,
    pub content: String,
    pub page_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}
