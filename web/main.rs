mod book;
mod error;
mod memory;
mod quote;

use axum::{
    Router,
    routing::{get, post, put},
};
use shelf::{config::Config, cover::CoverStorage, database, database::Database, logging};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<CoverStorage>,
}

fn router(state: AppState) -> Router {
    let covers = ServeDir::new(state.storage.root());

    Router::new()
        .route("/api/books", get(book::get_books).post(book::post_book))
        .route("/api/books/batch", post(book::post_books_batch))
        .route("/api/books/genres", get(book::get_genres))
        .route(
            "/api/books/{id}",
            get(book::get_book)
                .put(book::put_book)
                .delete(book::delete_book),
        )
        .route(
            "/api/books/{book_id}/memories",
            get(memory::get_memories).post(memory::post_memory),
        )
        .route(
            "/api/books/{book_id}/memories/{id}",
            put(memory::put_memory).delete(memory::delete_memory),
        )
        .route(
            "/api/books/{book_id}/quotes",
            get(quote::get_quotes).post(quote::post_quote),
        )
        .route(
            "/api/books/{book_id}/quotes/{id}",
            put(quote::put_quote).delete(quote::delete_quote),
        )
        .nest_service("/uploads/covers", covers)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let config = Config::from_env()?;

    let db = Database::with_migration(database::connect(&config.database_url).await?).await?;
    let storage = CoverStorage::with_options(
        &config.upload_dir,
        config.cover_prefixes.clone(),
        config.download_timeout,
    )?;

    let state = AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
