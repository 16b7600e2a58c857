//! Per-entity-type hooks plugged into the update orchestrator.

use async_trait::async_trait;

use crate::change::{ChangeRecorder, FieldPolicy};
use crate::error::TesseraResult;
use crate::types::Entity;

/// Strategy object supplied once per entity type.
///
/// The orchestrator calls `validate` before anything is read or written,
/// `entity_specific_update` while diffing an update, and
/// `store_relationships` once after the entity body is durable.
#[async_trait]
pub trait EntityHooks: Send + Sync {
    /// Reject a proposed entity with a `Validation` error.
    async fn validate(&self, entity: &Entity) -> TesseraResult<()>;

    /// Field impact and comparison rules for this type.
    fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::default()
    }

    /// Record changes the structural diff cannot see or gets wrong.
    fn entity_specific_update(
        &self,
        _recorder: &mut ChangeRecorder,
        _original: &Entity,
        _updated: &Entity,
    ) {
    }

    /// Persist references to other entities.
    async fn store_relationships(&self, _entity: &Entity) -> TesseraResult<()> {
        Ok(())
    }
}
