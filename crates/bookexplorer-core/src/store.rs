//! Local book store. One SQLite table of books keyed by a generated integer id.
//!
//! rusqlite is blocking, so every call runs on the blocking pool behind a mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};

use crate::book::Book;

/// Durable home of the book collection.
///
/// `update` and `delete` report how many rows they touched; zero is not an error.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a book and return the id the store generated for it. Any `id` on `book` is ignored.
    async fn insert(&self, book: &Book) -> Result<i64, StoreError>;
    /// Overwrite the stored book with the same id.
    async fn update(&self, book: &Book) -> Result<usize, StoreError>;
    /// Remove the stored book with the same id.
    async fn delete(&self, book: &Book) -> Result<usize, StoreError>;
    /// Every stored book, oldest first.
    async fn get_all(&self) -> Result<Vec<Book>, StoreError>;
    /// Books whose title matches a SQL `LIKE` pattern (`%` and `_` wildcards).
    async fn find_by_title(&self, pattern: &str) -> Result<Vec<Book>, StoreError>;
}

const CREATE_BOOKS: &str = "CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    description TEXT NOT NULL,
    thumbnail TEXT NOT NULL
)";

const SELECT_BOOKS: &str = "SELECT id, title, author, description, thumbnail FROM books";

/// [`BookStore`] backed by an SQLite file (or an in-memory database for tests).
#[derive(Debug, Clone)]
pub struct SqliteBookStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookStore {
    /// Open (or create) the database at `path` and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened book database");
        Self::from_connection(conn)
    }

    /// A private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_BOOKS, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&*conn).map_err(StoreError::from)
        })
        .await?
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        thumbnail: row.get(4)?,
    })
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn insert(&self, book: &Book) -> Result<i64, StoreError> {
        let book = book.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO books (title, author, description, thumbnail) VALUES (?1, ?2, ?3, ?4)",
                params![book.title, book.author, book.description, book.thumbnail],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn update(&self, book: &Book) -> Result<usize, StoreError> {
        let Some(id) = book.id else {
            return Ok(0);
        };
        let book = book.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE books SET title = ?1, author = ?2, description = ?3, thumbnail = ?4
                 WHERE id = ?5",
                params![book.title, book.author, book.description, book.thumbnail, id],
            )
        })
        .await
    }

    async fn delete(&self, book: &Book) -> Result<usize, StoreError> {
        let Some(id) = book.id else {
            return Ok(0);
        };
        self.with_conn(move |conn| conn.execute("DELETE FROM books WHERE id = ?1", params![id]))
            .await
    }

    async fn get_all(&self) -> Result<Vec<Book>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_BOOKS} ORDER BY id"))?;
            let books = stmt
                .query_map([], book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            books
        })
        .await
    }

    async fn find_by_title(&self, pattern: &str) -> Result<Vec<Book>, StoreError> {
        let pattern = pattern.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_BOOKS} WHERE title LIKE ?1 ORDER BY id"))?;
            let books = stmt
                .query_map([pattern], book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            books
        })
        .await
    }
}

/// Wrap a title fragment so it matches anywhere in the title. The empty fragment matches everything.
pub fn contains_pattern(fragment: &str) -> String {
    format!("%{fragment}%")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory: {0}")]
    CreateDir(std::io::Error),
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("database connection lock poisoned")]
    Poisoned,
}
