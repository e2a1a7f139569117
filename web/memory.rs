use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use shelf::{
    app::memory,
    model::{BookId, Memory, MemoryId},
};

#[derive(Deserialize)]
pub struct MemoryBody {
    #[serde(default)]
    content: String,
}

pub async fn get_memories(
    State(app): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Vec<Memory>>, ApiError> {
    Ok(Json(memory::list_memories(&app.db, BookId::from(book_id)).await?))
}

pub async fn post_memory(
    State(app): State<AppState>,
    Path(book_id): Path<i64>,
    Json(body): Json<MemoryBody>,
) -> Result<Json<Memory>, ApiError> {
    let memory = memory::create_memory(&app.db, BookId::from(book_id), &body.content).await?;

    Ok(Json(memory))
}

/// The book segment of the path is not checked; memories are addressed by their own id.
pub async fn put_memory(
    State(app): State<AppState>,
    Path((_book_id, id)): Path<(i64, i64)>,
    Json(body): Json<MemoryBody>,
) -> Result<Json<Memory>, ApiError> {
    let memory = memory::update_memory(&app.db, MemoryId::from(id), &body.content).await?;

    Ok(Json(memory))
}

pub async fn delete_memory(
    State(app): State<AppState>,
    Path((_book_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    memory::delete_memory(&app.db, MemoryId::from(id)).await?;

    Ok(StatusCode::OK)
}
