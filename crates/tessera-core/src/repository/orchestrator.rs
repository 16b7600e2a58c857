//! Create/update lifecycle for every entity type.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::change::ChangeRecorder;
use crate::config::{RetryPolicy, TesseraConfig};
use crate::error::{TesseraError, TesseraResult};
use crate::events::{
    EntityCreatedEvent, EntityLifecycleEvent, EntityUpdatedEvent, EventBus, EventSubscriber,
};
use crate::repository::HookRegistry;
use crate::store::{Database, SqliteEntityStore};
use crate::traits::{EntityHooks, EntityStore};
use crate::types::{ChangeDescription, ChangeKind, Entity, HistoryEntry, Version};

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    /// The entity as persisted, with identity and version assigned
    pub entity: Entity,
    pub change_description: ChangeDescription,
    pub change_kind: ChangeKind,
}

/// Generic entity repository.
///
/// Every entity type goes through the same pipeline: validate, resolve the
/// original, diff and classify, assign the version, persist, persist
/// relationships, return. Per-type behavior comes from the [`HookRegistry`].
pub struct EntityRepository {
    store: Arc<dyn EntityStore>,
    hooks: HookRegistry,
    event_bus: Option<EventBus>,
    conflict_retry: RetryPolicy,
}

impl EntityRepository {
    /// Create a repository over any entity store.
    pub fn new(store: Arc<dyn EntityStore>, hooks: HookRegistry) -> Self {
        Self {
            store,
            hooks,
            event_bus: None,
            conflict_retry: RetryPolicy::default(),
        }
    }

    /// Open the configured database and wire an event bus of the configured
    /// capacity. The configured conflict retry policy is kept for callers
    /// that retry stale writes.
    pub fn from_config(config: &TesseraConfig, hooks: HookRegistry) -> TesseraResult<Self> {
        let db = Database::open(config)?;
        Ok(Self::with_database(&db, hooks)
            .with_event_bus(EventBus::from_config(config))
            .with_conflict_retry(config.conflict_retry.clone()))
    }

    /// Create a repository backed by the SQLite entity store.
    pub fn with_database(db: &Database, hooks: HookRegistry) -> Self {
        Self::new(Arc::new(SqliteEntityStore::new(db)), hooks)
    }

    /// Emit an [`EntityLifecycleEvent`] after every persisted create or update.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_conflict_retry(mut self, policy: RetryPolicy) -> Self {
        self.conflict_retry = policy;
        self
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Policy for retrying submits that fail with a concurrency conflict.
    pub fn conflict_retry(&self) -> &RetryPolicy {
        &self.conflict_retry
    }

    /// Subscribe to lifecycle events, when an event bus is attached.
    pub fn subscribe(&self) -> Option<EventSubscriber> {
        self.event_bus.as_ref().map(EventBus::subscribe)
    }

    /// Create or update an entity.
    ///
    /// The proposal is a create when it has no id, or when its id is not
    /// stored and no `expected_version` was given. Otherwise it is an update
    /// of the stored entity, checked against `expected_version` (or the
    /// version read here, when the caller gave none). A create whose id is
    /// already taken, under any type, is an already-exists conflict.
    pub async fn submit(
        &self,
        entity_type: &str,
        proposed: Entity,
        expected_version: Option<Version>,
    ) -> TesseraResult<SubmitResult> {
        let hooks = self.hooks.get(entity_type)?;
        if proposed.entity_type != entity_type {
            return Err(TesseraError::type_mismatch(
                entity_type,
                proposed.entity_type.as_str(),
            ));
        }

        // 1. Prepare
        hooks.validate(&proposed).await?;

        // 2. Resolve original
        let stored = match proposed.id {
            Some(id) => self.store.get(id).await?,
            None => None,
        };

        match (stored, proposed.id) {
            (Some(original), _) if original.entity_type == entity_type => {
                self.update(hooks.as_ref(), original, proposed, expected_version)
                    .await
            }
            // Stored under another type: no update target, and the id is taken
            (Some(other), Some(id)) => match expected_version {
                Some(_) => Err(TesseraError::not_found(entity_type, id)),
                None => Err(TesseraError::conflict(id, None, Some(other.version))),
            },
            (_, Some(id)) if expected_version.is_some() => {
                Err(TesseraError::not_found(entity_type, id))
            }
            (_, _) => self.create(hooks.as_ref(), proposed).await,
        }
    }

    async fn resolve(&self, entity_type: &str, id: Uuid) -> TesseraResult<Option<Entity>> {
        match self.store.get(id).await? {
            Some(stored) if stored.entity_type != entity_type => Ok(None),
            stored => Ok(stored),
        }
    }

    async fn create(&self, hooks: &dyn EntityHooks, mut entity: Entity) -> TesseraResult<SubmitResult> {
        // 3. Diff against nothing, 4. start at 1.0
        let change_description =
            ChangeRecorder::for_create(hooks.field_policy(), &entity.fields).finish_created();
        entity.version = Version::INITIAL;
        entity.updated_at = Utc::now();
        entity.change_description = Some(change_description.clone());

        // 5. Persist
        let stored = self.store.put(entity, None, ChangeKind::Created).await?;

        self.finish(hooks, stored, change_description, ChangeKind::Created)
            .await
    }

    async fn update(
        &self,
        hooks: &dyn EntityHooks,
        original: Entity,
        mut proposed: Entity,
        expected_version: Option<Version>,
    ) -> TesseraResult<SubmitResult> {
        let id = original.require_id()?;

        // 3. Diff & classify
        let mut recorder =
            ChangeRecorder::from_diff(hooks.field_policy(), &original.fields, &proposed.fields);
        hooks.entity_specific_update(&mut recorder, &original, &proposed);
        let (change_description, change_kind) = recorder.finish(original.version);

        if change_kind == ChangeKind::NoChange {
            if let Some(expected) = expected_version.filter(|v| *v != original.version) {
                return Err(TesseraError::conflict(id, Some(expected), Some(original.version)));
            }
            tracing::debug!(
                entity_type = %original.entity_type,
                %id,
                version = %original.version,
                "No change; nothing persisted"
            );
            return Ok(SubmitResult {
                entity: original,
                change_description,
                change_kind,
            });
        }

        // 4. Version assignment
        proposed.id = Some(id);
        proposed.version = change_description.new_version;
        proposed.updated_at = Utc::now();
        proposed.change_description = Some(change_description.clone());
        tracing::debug!(
            entity_type = %proposed.entity_type,
            %id,
            from = %original.version,
            to = %proposed.version,
            kind = change_kind.as_str(),
            "Classified update"
        );

        // 5. Persist against the version the caller observed
        let expected = expected_version.unwrap_or(original.version);
        let stored = self.store.put(proposed, Some(expected), change_kind).await?;

        self.finish(hooks, stored, change_description, change_kind)
            .await
    }

    async fn finish(
        &self,
        hooks: &dyn EntityHooks,
        stored: Entity,
        change_description: ChangeDescription,
        change_kind: ChangeKind,
    ) -> TesseraResult<SubmitResult> {
        let id = stored.require_id()?;

        // 6. Persist relationships. The entity write above stays in place.
        if let Err(e) = hooks.store_relationships(&stored).await {
            tracing::warn!(
                entity_type = %stored.entity_type,
                %id,
                version = %stored.version,
                error = %e,
                "Entity stored but relationships were not"
            );
            return Err(TesseraError::relationship_persist(
                stored.entity_type.clone(),
                id,
                change_description,
                e,
            ));
        }

        tracing::info!(
            entity_type = %stored.entity_type,
            %id,
            version = %stored.version,
            kind = change_kind.as_str(),
            "Persisted entity"
        );

        if let Some(ref event_bus) = self.event_bus {
            let event = match change_kind {
                ChangeKind::Created => EntityLifecycleEvent::Created(
                    EntityCreatedEvent::new(id, &stored.entity_type, change_description.clone())
                        .with_user(stored.updated_by.clone()),
                ),
                _ => EntityLifecycleEvent::Updated(
                    EntityUpdatedEvent::new(
                        id,
                        &stored.entity_type,
                        change_kind,
                        change_description.clone(),
                    )
                    .with_user(stored.updated_by.clone()),
                ),
            };
            event_bus.emit(event);
        }

        // 7. Return
        Ok(SubmitResult {
            entity: stored,
            change_description,
            change_kind,
        })
    }

    /// Latest snapshot of an entity.
    pub async fn fetch(&self, entity_type: &str, id: Uuid) -> TesseraResult<Entity> {
        self.resolve(entity_type, id)
            .await?
            .ok_or_else(|| TesseraError::not_found(entity_type, id))
    }

    /// Snapshot of an entity at a specific version.
    pub async fn fetch_version(
        &self,
        entity_type: &str,
        id: Uuid,
        version: Version,
    ) -> TesseraResult<Entity> {
        match self.store.get_version(id, version).await? {
            Some(record) if record.entity_type == entity_type => Ok(record.snapshot),
            _ => Err(TesseraError::not_found(entity_type, id)),
        }
    }

    /// Version history of an entity, oldest first.
    pub async fn history(&self, entity_type: &str, id: Uuid) -> TesseraResult<Vec<HistoryEntry>> {
        self.fetch(entity_type, id).await?;
        let records = self.store.list_versions(id).await?;
        Ok(records.iter().map(|r| r.to_history_entry()).collect())
    }

    /// Latest snapshots of every entity of a type.
    pub async fn list(&self, entity_type: &str) -> TesseraResult<Vec<Entity>> {
        self.store.list_by_type(entity_type).await
    }
}
