//! SQLite-backed versioned object store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{TesseraError, TesseraResult};
use crate::store::Database;
use crate::traits::EntityStore;
use crate::types::{ChangeDescription, ChangeKind, Entity, Version, VersionRecord};

/// Entity snapshots in `entities`, their history in `entity_versions`.
pub struct SqliteEntityStore {
    db: Database,
}

impl SqliteEntityStore {
    /// Create a store on a shared database handle.
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    fn stored_version(conn: &Connection, id: &str) -> TesseraResult<Option<Version>> {
        let version = conn
            .query_row(
                "SELECT version_major, version_minor FROM entities WHERE id = ?1",
                params![id],
                |row| Ok(Version::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(version)
    }

    fn parse_timestamp(value: &str) -> TesseraResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TesseraError::parse(e.to_string()))
    }

    fn row_to_version_record(row: &rusqlite::Row<'_>) -> TesseraResult<VersionRecord> {
        let entity_id: String = row.get(0)?;
        let entity_type: String = row.get(1)?;
        let major: u32 = row.get(2)?;
        let minor: u32 = row.get(3)?;
        let snapshot: String = row.get(4)?;
        let change_description: String = row.get(5)?;
        let change_kind: String = row.get(6)?;
        let recorded_at: String = row.get(7)?;

        Ok(VersionRecord {
            entity_id: Uuid::parse_str(&entity_id)
                .map_err(|e| TesseraError::parse(e.to_string()))?,
            entity_type,
            version: Version::new(major, minor),
            snapshot: serde_json::from_str(&snapshot)?,
            change_description: serde_json::from_str::<ChangeDescription>(&change_description)?,
            change_kind: ChangeKind::parse(&change_kind).ok_or_else(|| {
                TesseraError::parse(format!("unknown change kind '{}'", change_kind))
            })?,
            recorded_at: Self::parse_timestamp(&recorded_at)?,
        })
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn get(&self, id: Uuid) -> TesseraResult<Option<Entity>> {
        let conn = self.db.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT json FROM entities WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| serde_json::from_str(&j).map_err(TesseraError::from))
            .transpose()
    }

    async fn put(
        &self,
        mut entity: Entity,
        expected: Option<Version>,
        kind: ChangeKind,
    ) -> TesseraResult<Entity> {
        let id = *entity.id.get_or_insert_with(Uuid::new_v4);
        let id_str = id.to_string();
        let record = VersionRecord::for_snapshot(&entity, kind)?;
        let json = serde_json::to_string(&entity)?;
        let snapshot = serde_json::to_string(&record.snapshot)?;
        let change_description = serde_json::to_string(&record.change_description)?;

        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let stored = Self::stored_version(&tx, &id_str)?;
        match (expected, stored) {
            (None, None) => {
                tx.execute(
                    r#"INSERT INTO entities
                       (id, entity_type, version_major, version_minor, json, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                    params![
                        id_str,
                        entity.entity_type,
                        entity.version.major,
                        entity.version.minor,
                        json,
                        entity.updated_at.to_rfc3339(),
                    ],
                )?;
            }
            (None, Some(actual)) => return Err(TesseraError::conflict(id, None, Some(actual))),
            (Some(_), None) => return Err(TesseraError::not_found(&entity.entity_type, id)),
            (Some(expected), Some(actual)) if expected != actual => {
                return Err(TesseraError::conflict(id, Some(expected), Some(actual)));
            }
            (Some(expected), Some(_)) => {
                // Guard on the version again so the statement itself is the
                // compare-and-swap.
                let updated = tx.execute(
                    r#"UPDATE entities
                       SET version_major = ?2, version_minor = ?3, json = ?4, updated_at = ?5
                       WHERE id = ?1 AND version_major = ?6 AND version_minor = ?7"#,
                    params![
                        id_str,
                        entity.version.major,
                        entity.version.minor,
                        json,
                        entity.updated_at.to_rfc3339(),
                        expected.major,
                        expected.minor,
                    ],
                )?;
                if updated != 1 {
                    return Err(TesseraError::conflict(id, Some(expected), None));
                }
            }
        }

        tx.execute(
            r#"INSERT INTO entity_versions
               (entity_id, entity_type, version_major, version_minor, snapshot,
                change_description, change_kind, recorded_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                id_str,
                record.entity_type,
                record.version.major,
                record.version.minor,
                snapshot,
                change_description,
                record.change_kind.as_str(),
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            entity_type = %entity.entity_type,
            %id,
            version = %entity.version,
            kind = kind.as_str(),
            "Stored entity snapshot"
        );
        Ok(entity)
    }

    async fn list_versions(&self, id: Uuid) -> TesseraResult<Vec<VersionRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT entity_id, entity_type, version_major, version_minor, snapshot,
                      change_description, change_kind, recorded_at
               FROM entity_versions
               WHERE entity_id = ?1
               ORDER BY version_major ASC, version_minor ASC"#,
        )?;

        let results = stmt.query_map(params![id.to_string()], |row| {
            Ok(Self::row_to_version_record(row))
        })?;

        results
            .map(|r| r.map_err(TesseraError::from).and_then(|inner| inner))
            .collect()
    }

    async fn get_version(
        &self,
        id: Uuid,
        version: Version,
    ) -> TesseraResult<Option<VersionRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT entity_id, entity_type, version_major, version_minor, snapshot,
                      change_description, change_kind, recorded_at
               FROM entity_versions
               WHERE entity_id = ?1 AND version_major = ?2 AND version_minor = ?3"#,
        )?;

        stmt.query_row(
            params![id.to_string(), version.major, version.minor],
            |row| Ok(Self::row_to_version_record(row)),
        )
        .optional()?
        .transpose()
    }

    async fn list_by_type(&self, entity_type: &str) -> TesseraResult<Vec<Entity>> {
        let conn = self.db.lock()?;
        let mut stmt =
            conn.prepare("SELECT json FROM entities WHERE entity_type = ?1 ORDER BY id")?;

        let rows = stmt.query_map(params![entity_type], |row| row.get::<_, String>(0))?;

        rows.map(|r| {
            let json = r?;
            serde_json::from_str(&json).map_err(TesseraError::from)
        })
        .collect()
    }
}
