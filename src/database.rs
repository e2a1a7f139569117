use crate::{
    dialect::{CurrentDialect, CurrentRow, Dialect},
    model::{Book, BookFields, BookId, Memory, MemoryId, Quote, QuoteId},
};
use chrono::{DateTime, SecondsFormat, Utc};
pub use crate::dialect::Db;
pub use sqlx::Pool;
use sqlx::{
    FromRow, Row,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;

/// Opens a connection pool for `url`, creating the SQLite file and its
/// directory if they are missing.
pub async fn connect(url: &str) -> Result<Pool<Db>, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(dir) = options.get_filename().parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Formats a timestamp so that its text sorts in chronological order.
fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "created_at".to_string(),
            source: Box::new(e),
        })
}

impl FromRow<'_, CurrentRow> for Book {
    fn from_row(row: &CurrentRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;

        Ok(Book {
            id: BookId::from(id),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre: row.try_get("genre")?,
            isbn: row.try_get("isbn")?,
            publisher: row.try_get("publisher")?,
            year: row.try_get("publication_year")?,
            pages: row.try_get("pages")?,
            location: row.try_get("location")?,
            read_status: row.try_get("read_status")?,
            rating: row.try_get("rating")?,
            notes: row.try_get("notes")?,
            cover_image_path: row.try_get("cover_image_path")?,
        })
    }
}

impl FromRow<'_, CurrentRow> for Memory {
    fn from_row(row: &CurrentRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let book_id: i64 = row.try_get("book_id")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Memory {
            id: MemoryId::from(id),
            book_id: BookId::from(book_id),
            content: row.try_get("content")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

impl FromRow<'_, CurrentRow> for Quote {
    fn from_row(row: &CurrentRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let book_id: i64 = row.try_get("book_id")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Quote {
            id: QuoteId::from(id),
            book_id: BookId::from(book_id),
            content: row.try_get("content")?,
            page_number: row.try_get("page_number")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

/// Inserts one book row through `executor` and returns the assigned id.
async fn insert_book_row<'c, E>(
    executor: E,
    fields: &BookFields,
    cover_image_path: Option<&str>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Db>,
{
    sqlx::query_scalar(&CurrentDialect::insert_book_statement())
        .bind(&fields.title)
        .bind(fields.author.as_deref())
        .bind(fields.genre.as_deref())
        .bind(fields.isbn.as_deref())
        .bind(fields.publisher.as_deref())
        .bind(fields.year)
        .bind(fields.pages)
        .bind(fields.location.as_deref())
        .bind(fields.read_status_or_default())
        .bind(fields.rating)
        .bind(fields.notes.as_deref())
        .bind(cover_image_path)
        .fetch_one(executor)
        .await
}

/// The persistent store for books, memories and quotes.
///
/// This struct wraps an SQLx connection pool and provides save, lookup, listing
/// and removal operations for the three record kinds. SQL syntax is delegated
/// to `Dialect`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Db>,
}

impl Database {
    /// Wraps a pool whose schema is already in place.
    pub fn new(pool: Pool<Db>) -> Self {
        Self { pool }
    }

    /// Wraps a pool after creating any missing tables.
    pub async fn with_migration(pool: Pool<Db>) -> Result<Self, sqlx::Error> {
        CurrentDialect::migration(&pool).await?;

        Ok(Self { pool })
    }

    async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, DatabaseError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DatabaseError>>,
    {
        let max_retries = 3;
        for attempt in 0..max_retries {
            let result = op().await;
            match result {
                Ok(v) => return Ok(v),
                Err(ref e) if e.is_retryable() && attempt + 1 < max_retries => {
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("Retry loop should return before exceeding max_retries")
    }

    /// Inserts a new book and returns it with its assigned id.
    ///
    /// A missing read status is stored as [`DEFAULT_READ_STATUS`](crate::model::DEFAULT_READ_STATUS).
    pub async fn insert_book(
        &self,
        fields: &BookFields,
        cover_image_path: Option<&str>,
    ) -> Result<Book, DatabaseError> {
        let stmt = CurrentDialect::insert_book_statement();

        let id = self
            .retry(|| async {
                insert_book_row(&self.pool, fields, cover_image_path)
                    .await
                    .map_err(query_failed(DbOperation::InsertBook, &stmt))
            })
            .await?;

        Ok(Book::from_fields(
            BookId::from(id),
            fields.clone(),
            cover_image_path.map(String::from),
        ))
    }

    /// Inserts several books in a single transaction.
    ///
    /// Either every book is stored or none is.
    pub async fn insert_books(
        &self,
        entries: &[(BookFields, Option<String>)],
    ) -> Result<Vec<Book>, DatabaseError> {
        let stmt = CurrentDialect::insert_book_statement();
        let operation = || DbOperation::InsertBooks {
            count: entries.len(),
        };

        self.retry(|| async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            let mut books = Vec::with_capacity(entries.len());
            for (fields, cover_image_path) in entries {
                let id = insert_book_row(&mut *tx, fields, cover_image_path.as_deref())
                    .await
                    .map_err(query_failed(operation(), &stmt))?;

                books.push(Book::from_fields(
                    BookId::from(id),
                    fields.clone(),
                    cover_image_path.clone(),
                ));
            }

            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            Ok(books)
        })
        .await
    }

    /// Overwrites every stored column of `book`.
    pub async fn update_book(&self, book: &Book) -> Result<(), DatabaseError> {
        let stmt = CurrentDialect::update_book_statement();

        self.retry(|| async {
            sqlx::query(&stmt)
                .bind(&book.title)
                .bind(book.author.as_deref())
                .bind(book.genre.as_deref())
                .bind(book.isbn.as_deref())
                .bind(book.publisher.as_deref())
                .bind(book.year)
                .bind(book.pages)
                .bind(book.location.as_deref())
                .bind(&book.read_status)
                .bind(book.rating)
                .bind(book.notes.as_deref())
                .bind(book.cover_image_path.as_deref())
                .bind(book.id.get())
                .execute(&self.pool)
                .await
                .map_err(query_failed(DbOperation::UpdateBook { id: book.id }, &stmt))
        })
        .await?;

        Ok(())
    }

    pub async fn get_book(&self, id: BookId) -> Result<Option<Book>, DatabaseError> {
        let stmt = CurrentDialect::select_book_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryBook { id }, &stmt))
        })
        .await
    }

    pub async fn book_exists(&self, id: BookId) -> Result<bool, DatabaseError> {
        let stmt = CurrentDialect::exists_book_statement();

        self.retry(|| async {
            sqlx::query_scalar(&stmt)
                .bind(id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryBook { id }, &stmt))
        })
        .await
    }

    /// Lists every book by rating, highest first, with unrated books last.
    pub async fn list_books_by_rating(&self) -> Result<Vec<Book>, DatabaseError> {
        let stmt = CurrentDialect::list_books_by_rating_statement();

        self.retry(|| async {
            sqlx::query_as(stmt)
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryBooks, stmt))
        })
        .await
    }

    /// Lists every book in insertion order.
    pub async fn list_books(&self) -> Result<Vec<Book>, DatabaseError> {
        let stmt = CurrentDialect::list_books_statement();

        self.retry(|| async {
            sqlx::query_as(stmt)
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryBooks, stmt))
        })
        .await
    }

    /// Removes a book together with its memories and quotes.
    ///
    /// This is a transactional operation: if any step fails, the entire
    /// transaction is rolled back.
    pub async fn delete_book(&self, id: BookId) -> Result<(), DatabaseError> {
        let stmt_memories = CurrentDialect::delete_memories_by_book_statement();
        let stmt_quotes = CurrentDialect::delete_quotes_by_book_statement();
        let stmt_book = CurrentDialect::delete_book_statement();

        self.retry(|| async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            for stmt in [&stmt_memories, &stmt_quotes, &stmt_book] {
                sqlx::query(stmt)
                    .bind(id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(query_failed(DbOperation::DeleteBook { id }, stmt))?;
            }

            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })
        })
        .await
    }

    pub async fn insert_memory(
        &self,
        book_id: BookId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Memory, DatabaseError> {
        let stmt = CurrentDialect::insert_memory_statement();
        let timestamp = format_timestamp(&created_at);

        let id: i64 = self
            .retry(|| async {
                sqlx::query_scalar(&stmt)
                    .bind(book_id.get())
                    .bind(content)
                    .bind(&timestamp)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(query_failed(DbOperation::InsertMemory { book_id }, &stmt))
            })
            .await?;

        Ok(Memory {
            id: MemoryId::from(id),
            book_id,
            content: content.to_string(),
            created_at,
        })
    }

    /// Stores the content of `memory`. Its owner and creation time never change.
    pub async fn update_memory(&self, memory: &Memory) -> Result<(), DatabaseError> {
        let stmt = CurrentDialect::update_memory_statement();

        self.retry(|| async {
            sqlx::query(&stmt)
                .bind(&memory.content)
                .bind(memory.id.get())
                .execute(&self.pool)
                .await
                .map_err(query_failed(DbOperation::UpdateMemory { id: memory.id }, &stmt))
        })
        .await?;

        Ok(())
    }

    pub async fn get_memory(&self, id: MemoryId) -> Result<Option<Memory>, DatabaseError> {
        let stmt = CurrentDialect::select_memory_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryMemory { id }, &stmt))
        })
        .await
    }

    pub async fn memory_exists(&self, id: MemoryId) -> Result<bool, DatabaseError> {
        let stmt = CurrentDialect::exists_memory_statement();

        self.retry(|| async {
            sqlx::query_scalar(&stmt)
                .bind(id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryMemory { id }, &stmt))
        })
        .await
    }

    pub async fn delete_memory(&self, id: MemoryId) -> Result<(), DatabaseError> {
        let stmt = CurrentDialect::delete_memory_statement();

        self.retry(|| async {
            sqlx::query(&stmt)
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(query_failed(DbOperation::DeleteMemory { id }, &stmt))
        })
        .await?;

        Ok(())
    }

    /// Lists the memories of a book, newest first.
    pub async fn memories_by_book(&self, book_id: BookId) -> Result<Vec<Memory>, DatabaseError> {
        let stmt = CurrentDialect::memories_by_book_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(book_id.get())
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryMemories { book_id }, &stmt))
        })
        .await
    }

    pub async fn insert_quote(
        &self,
        book_id: BookId,
        content: &str,
        page_number: Option<i32>,
        created_at: DateTime<Utc>,
    ) -> Result<Quote, DatabaseError> {
        let stmt = CurrentDialect::insert_quote_statement();
        let timestamp = format_timestamp(&created_at);

        let id: i64 = self
            .retry(|| async {
                sqlx::query_scalar(&stmt)
                    .bind(book_id.get())
                    .bind(content)
                    .bind(page_number)
                    .bind(&timestamp)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(query_failed(DbOperation::InsertQuote { book_id }, &stmt))
            })
            .await?;

        Ok(Quote {
            id: QuoteId::from(id),
            book_id,
            content: content.to_string(),
            page_number,
            created_at,
        })
    }

    /// Stores the content and page of `quote`. Its owner and creation time never change.
    pub async fn update_quote(&self, quote: &Quote) -> Result<(), DatabaseError> {
        let stmt = CurrentDialect::update_quote_statement();

        self.retry(|| async {
            sqlx::query(&stmt)
                .bind(&quote.content)
                .bind(quote.page_number)
                .bind(quote.id.get())
                .execute(&self.pool)
                .await
                .map_err(query_failed(DbOperation::UpdateQuote { id: quote.id }, &stmt))
        })
        .await?;

        Ok(())
    }

    pub async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, DatabaseError> {
        let stmt = CurrentDialect::select_quote_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryQuote { id }, &stmt))
        })
        .await
    }

    pub async fn quote_exists(&self, id: QuoteId) -> Result<bool, DatabaseError> {
        let stmt = CurrentDialect::exists_quote_statement();

        self.retry(|| async {
            sqlx::query_scalar(&stmt)
                .bind(id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryQuote { id }, &stmt))
        })
        .await
    }

    pub async fn delete_quote(&self, id: QuoteId) -> Result<(), DatabaseError> {
        let stmt = CurrentDialect::delete_quote_statement();

        self.retry(|| async {
            sqlx::query(&stmt)
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(query_failed(DbOperation::DeleteQuote { id }, &stmt))
        })
        .await?;

        Ok(())
    }

    /// Lists the quotes of a book by page number, quotes without a page last.
    pub async fn quotes_by_book(&self, book_id: BookId) -> Result<Vec<Quote>, DatabaseError> {
        let stmt = CurrentDialect::quotes_by_book_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(book_id.get())
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed(DbOperation::QueryQuotes { book_id }, &stmt))
        })
        .await
    }
}

fn query_failed(operation: DbOperation, sql: &str) -> impl FnOnce(sqlx::Error) -> DatabaseError {
    let sql = sql.to_string();
    move |source| DatabaseError::QueryFailed {
        operation,
        sql,
        source,
    }
}

/// Represents errors that can occur during database operations.
///
/// Each variant includes contextual information to assist with debugging and error handling.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A general SQL query failure, with the operation attempted and the SQL text.
    #[error("Query failed during {operation:?}: sql={sql}")]
    QueryFailed {
        operation: DbOperation,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// A failure to begin or commit a transaction.
    #[error("Failed to operate transaction")]
    TransactionFailed {
        #[source]
        source: sqlx::Error,
    },
}

/// Enum representing the kind of database operation being performed,
/// used for attaching context to [`DatabaseError::QueryFailed`].
#[derive(Debug)]
pub enum DbOperation {
    /// INSERT INTO books
    InsertBook,
    /// INSERT INTO books, batched in one transaction
    InsertBooks { count: usize },
    /// UPDATE books
    UpdateBook { id: BookId },
    /// SELECT ... FROM books WHERE id = ...
    QueryBook { id: BookId },
    /// SELECT * FROM books
    QueryBooks,
    /// DELETE FROM books, memories and quotes of one book
    DeleteBook { id: BookId },
    InsertMemory { book_id: BookId },
    UpdateMemory { id: MemoryId },
    QueryMemory { id: MemoryId },
    QueryMemories { book_id: BookId },
    DeleteMemory { id: MemoryId },
    InsertQuote { book_id: BookId },
    UpdateQuote { id: QuoteId },
    QueryQuote { id: QuoteId },
    QueryQuotes { book_id: BookId },
    DeleteQuote { id: QuoteId },
}

impl DatabaseError {
    fn is_retryable(&self) -> bool {
        let is_retryable_kind = |e: &sqlx::Error| {
            matches!(e, sqlx::Error::Io(_))
                || matches!(e, sqlx::Error::Protocol(_))
                || matches!(e, sqlx::Error::PoolTimedOut)
        };

        match self {
            DatabaseError::QueryFailed { source, .. } => is_retryable_kind(source),
            DatabaseError::TransactionFailed { source } => is_retryable_kind(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        database::{Database, Db, Pool},
        model::{BookFields, BookId, DEFAULT_READ_STATUS, MemoryId, QuoteId},
    };
    use chrono::{Duration, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    /// Returns an in-memory SQLite connection pool for testing.
    async fn get_pool() -> Pool<Db> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    async fn get_db() -> Database {
        Database::with_migration(get_pool().await).await.unwrap()
    }

    fn rated(title: &str, rating: Option<i32>) -> BookFields {
        let mut fields = BookFields::new(title);
        fields.rating = rating;
        fields
    }

    /// Verifies that `Database::with_migration` can be called multiple times
    /// on the same pool without error.
    #[tokio::test]
    async fn test_migration_idempotency() {
        let pool = get_pool().await;

        Database::with_migration(pool.clone()).await.unwrap();
        Database::with_migration(pool.clone()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_book() {
        let db = get_db().await;

        let mut fields = BookFields::new("Dune");
        fields.author = Some("Frank Herbert".to_string());
        fields.year = Some(1965);

        let book = db
            .insert_book(&fields, Some("/uploads/covers/a.png"))
            .await
            .unwrap();

        assert_eq!(DEFAULT_READ_STATUS, book.read_status);
        assert_eq!(Some(book.clone()), db.get_book(book.id).await.unwrap());
        assert!(db.book_exists(book.id).await.unwrap());

        assert_eq!(None, db.get_book(BookId::from(4242)).await.unwrap());
        assert!(!db.book_exists(BookId::from(4242)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_books_by_rating_puts_unrated_last() {
        let db = get_db().await;

        let unrated = db.insert_book(&rated("Unrated", None), None).await.unwrap();
        let three = db.insert_book(&rated("Three", Some(3)), None).await.unwrap();
        let five = db.insert_book(&rated("Five", Some(5)), None).await.unwrap();
        let one = db.insert_book(&rated("One", Some(1)), None).await.unwrap();

        let ids: Vec<BookId> = db
            .list_books_by_rating()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();

        assert_eq!(vec![five.id, three.id, one.id, unrated.id], ids);
        assert_eq!(4, db.list_books().await.unwrap().len());
    }

    #[tokio::test]
    async fn test_update_book() {
        let db = get_db().await;

        let mut book = db.insert_book(&rated("Dune", Some(4)), None).await.unwrap();
        book.title = "Dune Messiah".to_string();
        book.rating = None;
        book.cover_image_path = Some("/uploads/covers/b.jpg".to_string());

        db.update_book(&book).await.unwrap();

        assert_eq!(Some(book.clone()), db.get_book(book.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_books() {
        let db = get_db().await;

        let entries = vec![
            (BookFields::new("Dune"), None),
            (
                BookFields::new("Emma"),
                Some("/uploads/covers/emma.jpg".to_string()),
            ),
        ];

        let books = db.insert_books(&entries).await.unwrap();

        assert_eq!(2, books.len());
        assert_ne!(books[0].id, books[1].id);
        assert_eq!(
            Some("/uploads/covers/emma.jpg".to_string()),
            db.get_book(books[1].id).await.unwrap().unwrap().cover_image_path
        );
    }

    #[tokio::test]
    async fn test_memories_newest_first() {
        let db = get_db().await;
        let book = db.insert_book(&BookFields::new("Dune"), None).await.unwrap();
        let now = Utc::now();

        let older = db
            .insert_memory(book.id, "first read", now - Duration::days(2))
            .await
            .unwrap();
        let newer = db.insert_memory(book.id, "re-read", now).await.unwrap();

        assert_eq!(
            vec![newer.clone(), older.clone()],
            db.memories_by_book(book.id).await.unwrap()
        );
        assert_eq!(Some(older.clone()), db.get_memory(older.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_delete_memory() {
        let db = get_db().await;
        let book = db.insert_book(&BookFields::new("Dune"), None).await.unwrap();

        let mut memory = db.insert_memory(book.id, "first", Utc::now()).await.unwrap();
        memory.content = "edited".to_string();
        db.update_memory(&memory).await.unwrap();

        assert_eq!(Some(memory.clone()), db.get_memory(memory.id).await.unwrap());

        db.delete_memory(memory.id).await.unwrap();
        assert!(!db.memory_exists(memory.id).await.unwrap());
        assert!(!db.memory_exists(MemoryId::from(4242)).await.unwrap());
    }

    #[tokio::test]
    async fn test_quotes_by_page_with_unpaged_last() {
        let db = get_db().await;
        let book = db.insert_book(&BookFields::new("Dune"), None).await.unwrap();
        let now = Utc::now();

        let unpaged = db.insert_quote(book.id, "Fear", None, now).await.unwrap();
        let late = db.insert_quote(book.id, "Spice", Some(200), now).await.unwrap();
        let early = db.insert_quote(book.id, "Desert", Some(12), now).await.unwrap();

        let ids: Vec<QuoteId> = db
            .quotes_by_book(book.id)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();

        assert_eq!(vec![early.id, late.id, unpaged.id], ids);
    }

    #[tokio::test]
    async fn test_update_and_delete_quote() {
        let db = get_db().await;
        let book = db.insert_book(&BookFields::new("Dune"), None).await.unwrap();

        let mut quote = db
            .insert_quote(book.id, "Fear is the mind-killer", Some(8), Utc::now())
            .await
            .unwrap();
        quote.page_number = None;
        db.update_quote(&quote).await.unwrap();

        assert_eq!(Some(quote.clone()), db.get_quote(quote.id).await.unwrap());

        db.delete_quote(quote.id).await.unwrap();
        assert!(!db.quote_exists(quote.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_book_removes_owned_records() {
        let db = get_db().await;
        let book = db.insert_book(&BookFields::new("Dune"), None).await.unwrap();
        let other = db.insert_book(&BookFields::new("Emma"), None).await.unwrap();

        let memory = db.insert_memory(book.id, "note", Utc::now()).await.unwrap();
        let quote = db.insert_quote(book.id, "line", Some(1), Utc::now()).await.unwrap();
        let kept = db.insert_memory(other.id, "kept", Utc::now()).await.unwrap();

        db.delete_book(book.id).await.unwrap();

        assert!(!db.book_exists(book.id).await.unwrap());
        assert!(!db.memory_exists(memory.id).await.unwrap());
        assert!(!db.quote_exists(quote.id).await.unwrap());
        assert!(db.memories_by_book(book.id).await.unwrap().is_empty());
        assert!(db.memory_exists(kept.id).await.unwrap());
    }
}
