use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use bytes::BytesMut;
use futures::TryStreamExt;
use serde::Deserialize;
use shelf::{
    app::{self, CreateBookCommand, UpdateBookCommand},
    model::{Book, BookFields, BookId, CoverUpload, NewBook},
    query::BookQuery,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksParams {
    search: Option<String>,
    genre: Option<String>,
    read_status: Option<String>,
}

impl From<BooksParams> for BookQuery {
    fn from(value: BooksParams) -> Self {
        BookQuery {
            search: value.search,
            genre: value.genre,
            read_status: value.read_status,
        }
    }
}

/// A book form as sent by the browser, including its cover sources.
struct BookForm {
    fields: BookFields,
    cover_upload: Option<CoverUpload>,
    cover_url: Option<String>,
}

async fn read_book_form(mut multipart: Multipart) -> Result<BookForm, ApiError> {
    let mut form = BookForm {
        fields: BookFields::default(),
        cover_upload: None,
        cover_url: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "coverImage" {
            let content_type = field.content_type().map(String::from);
            let filename = field.file_name().map(String::from);

            let mut data = BytesMut::new();
            let mut stream = field.into_stream();
            while let Some(chunk) = stream.try_next().await? {
                data.extend_from_slice(&chunk);
            }

            form.cover_upload = Some(CoverUpload {
                bytes: data.freeze().to_vec(),
                content_type,
                filename,
            });
            continue;
        }

        let text = field.text().await?;
        let fields = &mut form.fields;
        match name.as_str() {
            "title" => fields.title = text,
            "author" => fields.author = non_empty(text),
            "genre" => fields.genre = non_empty(text),
            "isbn" => fields.isbn = non_empty(text),
            "publisher" => fields.publisher = non_empty(text),
            "year" => fields.year = parse_number("year", &text)?,
            "pages" => fields.pages = parse_number("pages", &text)?,
            "location" => fields.location = non_empty(text),
            "readStatus" => fields.read_status = non_empty(text),
            "rating" => fields.rating = parse_number("rating", &text)?,
            "notes" => fields.notes = non_empty(text),
            "coverImageUrl" => form.cover_url = non_empty(text),
            _ => {} // ignore
        }
    }

    Ok(form)
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn parse_number(name: &str, text: &str) -> Result<Option<i32>, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    text.parse()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("{name} must be an integer")))
}

pub async fn get_books(
    State(app): State<AppState>,
    Query(params): Query<BooksParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = app::search_books(&app.db, &params.into()).await?;

    Ok(Json(books))
}

pub async fn get_genres(State(app): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(app::list_genres(&app.db).await?))
}

pub async fn get_book(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(app::find_book(&app.db, BookId::from(id)).await?))
}

pub async fn post_book(
    State(app): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Book>, ApiError> {
    let form = read_book_form(multipart).await?;

    let mut cmd = CreateBookCommand::new(form.fields);
    if let Some(upload) = form.cover_upload {
        cmd = cmd.with_cover_upload(upload);
    }
    if let Some(url) = form.cover_url {
        cmd = cmd.with_cover_url(url);
    }

    let book = cmd.execute(&app.storage, &app.db).await?;

    Ok(Json(book))
}

pub async fn post_books_batch(
    State(app): State<AppState>,
    Json(entries): Json<Vec<NewBook>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = app::create_books(&app.storage, &app.db, entries).await?;

    Ok(Json(books))
}

pub async fn put_book(
    State(app): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Book>, ApiError> {
    let form = read_book_form(multipart).await?;

    let mut cmd = UpdateBookCommand::new(BookId::from(id), form.fields);
    if let Some(upload) = form.cover_upload {
        cmd = cmd.with_cover_upload(upload);
    }
    if let Some(url) = form.cover_url {
        cmd = cmd.with_cover_url(url);
    }

    let book = cmd.execute(&app.storage, &app.db).await?;

    Ok(Json(book))
}

pub async fn delete_book(
    State(app): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    app::delete_book(&app.storage, &app.db, BookId::from(id)).await?;

    Ok(StatusCode::OK)
}
