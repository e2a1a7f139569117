use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use shelf::{
    app::quote,
    model::{BookId, Quote, QuoteId},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBody {
    #[serde(default)]
    content: String,
    #[serde(default)]
    page_number: Option<i32>,
}

pub async fn get_quotes(
    State(app): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Vec<Quote>>, ApiError> {
    Ok(Json(quote::list_quotes(&app.db, BookId::from(book_id)).await?))
}

pub async fn post_quote(
    State(app): State<AppState>,
    Path(book_id): Path<i64>,
    Json(body): Json<QuoteBody>,
) -> Result<Json<Quote>, ApiError> {
    let quote = quote::create_quote(
        &app.db,
        BookId::from(book_id),
        &body.content,
        body.page_number,
    )
    .await?;

    Ok(Json(quote))
}

pub async fn put_quote(
    State(app): State<AppState>,
    Path((_book_id, id)): Path<(i64, i64)>,
    Json(body): Json<QuoteBody>,
) -> Result<Json<Quote>, ApiError> {
    let quote = quote::update_quote(&app.db, QuoteId::from(id), &body.content, body.page_number)
        .await?;

    Ok(Json(quote))
}

pub async fn delete_quote(
    State(app): State<AppState>,
    Path((_book_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    quote::delete_quote(&app.db, QuoteId::from(id)).await?;

    Ok(StatusCode::OK)
}
