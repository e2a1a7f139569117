//! Quotes: passages from a book with an optional page number.

use super::{AppError, validate_content};
use crate::{
    database::Database,
    model::{BookId, Quote, QuoteId},
};
use chrono::Utc;
use tracing::info;

/// Lists the quotes of a book by page, quotes without a page last.
pub async fn list_quotes(db: &Database, book_id: BookId) -> Result<Vec<Quote>, AppError> {
    Ok(db.quotes_by_book(book_id).await?)
}

/// Attaches a new quote to an existing book.
///
/// # Returns
///
/// Returns `AppError::BookNotFound` if the owning book does not exist.
pub async fn create_quote(
    db: &Database,
    book_id: BookId,
    content: &str,
    page_number: Option<i32>,
) -> Result<Quote, AppError> {
    validate_content(content)?;

    if !db.book_exists(book_id).await? {
        return Err(AppError::BookNotFound { id: book_id });
    }

    let quote = db
        .insert_quote(book_id, content, page_number, Utc::now())
        .await?;
    info!(id = %quote.id, %book_id, "created quote");

    Ok(quote)
}

/// Replaces the content and page number of a quote.
pub async fn update_quote(
    db: &Database,
    id: QuoteId,
    content: &str,
    page_number: Option<i32>,
) -> Result<Quote, AppError> {
    validate_content(content)?;

    let mut quote = db
        .get_quote(id)
        .await?
        .ok_or(AppError::QuoteNotFound { id })?;

    quote.content = content.to_string();
    quote.page_number = page_number;
    db.update_quote(&quote).await?;

    Ok(quote)
}

pub async fn delete_quote(db: &Database, id: QuoteId) -> Result<(), AppError> {
    if !db.quote_exists(id).await? {
        return Err(AppError::QuoteNotFound { id });
    }

    db.delete_quote(id).await?;
    info!(%id, "deleted quote");

    Ok(())
}
