//! In-memory filtering and genre aggregation over the book list.
//!
//! The input is expected to already be in display order (rating descending,
//! unrated books last). Filtering never reorders: matching books keep their
//! relative positions.

use crate::model::Book;
use std::collections::BTreeSet;

/// Conjunctive filter over books.
///
/// Each criterion is optional; an absent or empty criterion matches every book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    /// Case-insensitive substring matched against title or author.
    pub search: Option<String>,

    /// Genre tag, matched case-insensitively against each comma-separated tag.
    pub genre: Option<String>,

    /// Read status, matched exactly.
    pub read_status: Option<String>,
}

impl BookQuery {
    /// Creates a query matching every book.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search<T: Into<String>>(mut self, search: T) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_genre<T: Into<String>>(mut self, genre: T) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_read_status<T: Into<String>>(mut self, read_status: T) -> Self {
        self.read_status = Some(read_status.into());
        self
    }

    /// Returns whether `book` satisfies every criterion of this query.
    pub fn matches(&self, book: &Book) -> bool {
        self.matches_search(book) && self.matches_genre(book) && self.matches_read_status(book)
    }

    fn matches_search(&self, book: &Book) -> bool {
        let Some(term) = non_empty(&self.search) else {
            return true;
        };
        let term = term.to_lowercase();

        let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&term));

        contains(Some(book.title.as_str())) || contains(book.author.as_deref())
    }

    fn matches_genre(&self, book: &Book) -> bool {
        let Some(term) = non_empty(&self.genre) else {
            return true;
        };
        let term = term.to_lowercase();

        book.genre_tags().any(|tag| tag.to_lowercase() == term)
    }

    fn matches_read_status(&self, book: &Book) -> bool {
        match non_empty(&self.read_status) {
            Some(status) => book.read_status == status,
            None => true,
        }
    }
}

/// Keeps the books matching `query`, preserving their order.
pub fn filter_books(books: Vec<Book>, query: &BookQuery) -> Vec<Book> {
    books.into_iter().filter(|book| query.matches(book)).collect()
}

/// Collects every genre tag across `books`, sorted ascending without duplicates.
///
/// Tags are trimmed and empty ones dropped. Case is preserved, so `"Sci-Fi"`
/// and `"sci-fi"` are reported as two tags.
pub fn distinct_genres<'a, I>(books: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Book>,
{
    books
        .into_iter()
        .flat_map(Book::genre_tags)
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
