//! Shared SQLite database handle.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::{TesseraConfig, IN_MEMORY_PATH};
use crate::error::{TesseraError, TesseraResult};

/// One SQLite connection shared by every store.
///
/// Opened once at bootstrap and handed by reference to each store
/// constructor; clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database described by a configuration.
    pub fn open(config: &TesseraConfig) -> TesseraResult<Self> {
        let db = if config.is_in_memory() {
            Self::in_memory()?
        } else {
            Self::new(&config.database_path)?
        };
        db.lock()?
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Ok(db)
    }

    /// Open (or create) a database file.
    pub fn new(path: impl AsRef<Path>) -> TesseraResult<Self> {
        if path.as_ref().to_str() == Some(IN_MEMORY_PATH) {
            return Self::in_memory();
        }
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(TesseraError::connection_failed)?;
        tracing::debug!(path = %path.as_ref().display(), "Opened SQLite database");
        Self::from_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> TesseraResult<Self> {
        Self::from_connection(
            Connection::open_in_memory().map_err(TesseraError::connection_failed)?,
        )
    }

    fn from_connection(conn: Connection) -> TesseraResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection for one operation.
    pub(crate) fn lock(&self) -> TesseraResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TesseraError::lock_poisoned(format!("Connection lock poisoned: {}", e)))
    }

    fn init_schema(&self) -> TesseraResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                version_major INTEGER NOT NULL,
                version_minor INTEGER NOT NULL,
                json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entities_type
                ON entities(entity_type, id);

            CREATE TABLE IF NOT EXISTS entity_versions (
                entity_id TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                version_major INTEGER NOT NULL,
                version_minor INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                change_description TEXT NOT NULL,
                change_kind TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                UNIQUE(entity_id, version_major, version_minor)
            );

            CREATE TABLE IF NOT EXISTS extension_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                extension TEXT NOT NULL,
                record_name TEXT NOT NULL,
                json TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            -- Range scans per (category, extension)
            CREATE INDEX IF NOT EXISTS idx_extension_range
                ON extension_records(category, extension, timestamp);
        "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(db: &Database) -> Vec<String> {
        let conn = db.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_in_memory_creates_schema() {
        let db = Database::in_memory().unwrap();
        let names = table_names(&db);
        assert!(names.contains(&"entities".to_string()));
        assert!(names.contains(&"entity_versions".to_string()));
        assert!(names.contains(&"extension_records".to_string()));
    }

    #[test]
    fn test_open_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");
        let config = TesseraConfig::builder().database_path(&path).build();

        Database::open(&config).unwrap();
        let reopened = Database::open(&config).unwrap();
        assert!(path.exists());
        assert!(table_names(&reopened).contains(&"entities".to_string()));
    }

    #[test]
    fn test_unopenable_path_is_connection_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::new(dir.path().join("bad\0name.db")).err().unwrap();
        assert_eq!(err.code(), crate::error::ErrorCode::DbConnectionFailed);
    }
}
