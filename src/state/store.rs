use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task;

use super::data::{EncodedImage, Location, PhotoDraft, PhotoRecord};

/// Errors surfaced by the local photo store.
///
/// None of these are retried. A failed write leaves the store unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("persistent storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("failed to write photo: {0}")]
    WriteFailed(String),
    #[error("failed to read photos: {0}")]
    ReadFailed(String),
}

/// The LocalStore keeps every captured photo in a SQLite database.
///
/// Records are append-only: there is an insert and a bulk read, nothing else.
/// The handle is cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (or create) the photo database at `path`.
    ///
    /// Safe to call any number of times on the same path: the `photos`
    /// table is only created the first time.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        let open_path = db_path.clone();

        let conn = task::spawn_blocking(move || -> Result<Connection, StoreError> {
            // Ensure the parent directory exists
            if let Some(parent) = open_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
            }

            let conn = Connection::open(&open_path)
                .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
            init_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::StorageUnavailable(format!("task join error: {}", e)))??;

        tracing::info!(path = %db_path.display(), "photo store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(db_path),
        })
    }

    /// Open a store that lives only as long as the handle (used by tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Append a photo and return the id the database assigned to it.
    ///
    /// The future only resolves once the row is committed, so the record
    /// is visible to any `list_all` issued afterwards.
    pub async fn insert(&self, draft: PhotoDraft) -> Result<i64, StoreError> {
        let conn = Arc::clone(&self.conn);

        let id = task::spawn_blocking(move || -> Result<i64, StoreError> {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::WriteFailed("connection lock poisoned".to_string()))?;

            conn.execute(
                "INSERT INTO photos (title, photo, latitude, longitude, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.title,
                    draft.photo.as_str(),
                    draft.location.latitude,
                    draft.location.longitude,
                    draft.timestamp,
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(|e| StoreError::WriteFailed(format!("task join error: {}", e)))??;

        tracing::debug!(id, "photo inserted");
        Ok(id)
    }

    /// Every persisted photo, oldest first
    pub async fn list_all(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let conn = Arc::clone(&self.conn);

        let photos = task::spawn_blocking(move || -> Result<Vec<PhotoRecord>, StoreError> {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::ReadFailed("connection lock poisoned".to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, title, photo, latitude, longitude, timestamp
                     FROM photos ORDER BY id ASC",
                )
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(PhotoRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        photo: EncodedImage::new(row.get::<_, String>(2)?),
                        location: Location {
                            latitude: row.get(3)?,
                            longitude: row.get(4)?,
                        },
                        timestamp: row.get(5)?,
                    })
                })
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::ReadFailed(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::ReadFailed(format!("task join error: {}", e)))??;

        tracing::debug!(count = photos.len(), "photos loaded");
        Ok(photos)
    }

    /// Number of persisted photos
    pub async fn count(&self) -> Result<i64, StoreError> {
        let conn = Arc::clone(&self.conn);

        task::spawn_blocking(move || -> Result<i64, StoreError> {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::ReadFailed("connection lock poisoned".to_string()))?;
            conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))
                .map_err(|e| StoreError::ReadFailed(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::ReadFailed(format!("task join error: {}", e)))?
    }

    /// Run raw SQL against the connection, for breaking the store in tests
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql).unwrap();
    }
}

/// Create the photos table if it doesn't exist.
/// AUTOINCREMENT keeps ids strictly increasing and never reused.
fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS photos (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT,
            photo       TEXT NOT NULL,
            latitude    REAL NOT NULL,
            longitude   REAL NOT NULL,
            timestamp   TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

    Ok(())
}

// Implement Debug for better error messages
impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
