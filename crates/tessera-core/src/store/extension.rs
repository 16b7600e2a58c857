//! SQLite-backed extension record log.

use async_trait::async_trait;
use rusqlite::params;
use uuid::Uuid;

use crate::error::{TesseraError, TesseraResult};
use crate::store::Database;
use crate::traits::ExtensionStore;
use crate::types::ExtensionRecord;

/// Append-only log in the `extension_records` table.
pub struct SqliteExtensionStore {
    db: Database,
}

impl SqliteExtensionStore {
    /// Create a store on a shared database handle.
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> TesseraResult<ExtensionRecord> {
        let id: String = row.get(0)?;
        let json: String = row.get(4)?;
        Ok(ExtensionRecord {
            id: Uuid::parse_str(&id).map_err(|e| TesseraError::parse(e.to_string()))?,
            category: row.get(1)?,
            extension: row.get(2)?,
            record_name: row.get(3)?,
            payload: serde_json::from_str(&json)?,
            timestamp: row.get(5)?,
        })
    }
}

#[async_trait]
impl ExtensionStore for SqliteExtensionStore {
    async fn append(&self, record: &ExtensionRecord) -> TesseraResult<()> {
        let json = serde_json::to_string(&record.payload)?;
        let conn = self.db.lock()?;
        conn.execute(
            r#"INSERT INTO extension_records
               (id, category, extension, record_name, json, timestamp)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                record.id.to_string(),
                record.category,
                record.extension,
                record.record_name,
                json,
                record.timestamp,
            ],
        )?;
        tracing::trace!(
            category = %record.category,
            extension = %record.extension,
            timestamp = record.timestamp,
            "Appended extension record"
        );
        Ok(())
    }

    async fn list_between(
        &self,
        category: &str,
        extension: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> TesseraResult<Vec<ExtensionRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, category, extension, record_name, json, timestamp
               FROM extension_records
               WHERE category = ?1 AND extension = ?2
                 AND timestamp >= ?3 AND timestamp <= ?4
               ORDER BY timestamp ASC, seq ASC"#,
        )?;

        let rows = stmt.query_map(params![category, extension, start_ts, end_ts], |row| {
            Ok(Self::row_to_record(row))
        })?;

        rows.map(|r| r.map_err(TesseraError::from).and_then(|inner| inner))
            .collect()
    }
}
