//! Memories: free-text notes attached to a book.

use super::{AppError, validate_content};
use crate::{
    database::Database,
    model::{BookId, Memory, MemoryId},
};
use chrono::Utc;
use tracing::info;

/// Lists the memories of a book, newest first.
///
/// An unknown book simply has no memories.
pub async fn list_memories(db: &Database, book_id: BookId) -> Result<Vec<Memory>, AppError> {
    Ok(db.memories_by_book(book_id).await?)
}

/// Attaches a new memory to an existing book.
///
/// # Returns
///
/// Returns `AppError::BookNotFound` if the owning book does not exist.
pub async fn create_memory(
    db: &Database,
    book_id: BookId,
    content: &str,
) -> Result<Memory, AppError> {
    validate_content(content)?;

    if !db.book_exists(book_id).await? {
        return Err(AppError::BookNotFound { id: book_id });
    }

    let memory = db.insert_memory(book_id, content, Utc::now()).await?;
    info!(id = %memory.id, %book_id, "created memory");

    Ok(memory)
}

/// Replaces the content of a memory. Its book and creation time are kept.
pub async fn update_memory(db: &Database, id: MemoryId, content: &str) -> Result<Memory, AppError> {
    validate_content(content)?;

    let mut memory = db
        .get_memory(id)
        .await?
        .ok_or(AppError::MemoryNotFound { id })?;

    memory.content = content.to_string();
    db.update_memory(&memory).await?;

    Ok(memory)
}

pub async fn delete_memory(db: &Database, id: MemoryId) -> Result<(), AppError> {
    if !db.memory_exists(id).await? {
        return Err(AppError::MemoryNotFound { id });
    }

    db.delete_memory(id).await?;
    info!(%id, "deleted memory");

    Ok(())
}
