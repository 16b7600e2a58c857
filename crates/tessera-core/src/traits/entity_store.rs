//! Versioned object store trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TesseraResult;
use crate::types::{ChangeKind, Entity, Version, VersionRecord};

/// Keyed storage of entity snapshots plus their per-version history.
///
/// Implementations must make the expected-version check and the write a
/// single atomic step: of two writers presenting the same expected version,
/// exactly one may succeed.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get the latest snapshot of an entity.
    async fn get(&self, id: Uuid) -> TesseraResult<Option<Entity>>;

    /// Persist a snapshot and append its version record.
    ///
    /// `expected` is `None` for a create, in which case the id must not be
    /// stored yet; otherwise it must equal the stored version. A mismatch is
    /// a `ConcurrencyConflict`, a missing entity under `Some` is `NotFound`.
    /// An entity without an id is assigned a fresh one; the persisted entity
    /// is returned.
    async fn put(
        &self,
        entity: Entity,
        expected: Option<Version>,
        kind: ChangeKind,
    ) -> TesseraResult<Entity>;

    /// All version records of an entity, ascending by version.
    async fn list_versions(&self, id: Uuid) -> TesseraResult<Vec<VersionRecord>>;

    /// A specific version record.
    async fn get_version(&self, id: Uuid, version: Version)
        -> TesseraResult<Option<VersionRecord>>;

    /// Latest snapshots of every entity of a type, ordered by id.
    async fn list_by_type(&self, entity_type: &str) -> TesseraResult<Vec<Entity>>;
}
