//! Entity lifecycle events
//!
//! Emitted after a create or update has been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ChangeDescription, ChangeKind, Version};

/// Entity lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityLifecycleEvent {
    /// Entity was created at version 1.0
    Created(EntityCreatedEvent),
    /// Entity moved to a new version
    Updated(EntityUpdatedEvent),
}

impl EntityLifecycleEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "entity.created",
            Self::Updated(_) => "entity.updated",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::Created(e) => e.entity_id,
            Self::Updated(e) => e.entity_id,
        }
    }

    pub fn entity_type(&self) -> &str {
        match self {
            Self::Created(e) => &e.entity_type,
            Self::Updated(e) => &e.entity_type,
        }
    }

    /// Version the entity is at after the event
    pub fn version(&self) -> Version {
        match self {
            Self::Created(e) => e.version,
            Self::Updated(e) => e.version,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Created(e) => e.timestamp,
            Self::Updated(e) => e.timestamp,
        }
    }
}

/// Event payload for entity creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCreatedEvent {
    /// Unique event ID
    pub event_id: String,
    pub entity_id: Uuid,
    pub entity_type: String,
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub change_description: ChangeDescription,
    pub timestamp: DateTime<Utc>,
}

/// Event payload for an entity update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityUpdatedEvent {
    /// Unique event ID
    pub event_id: String,
    pub entity_id: Uuid,
    pub entity_type: String,
    /// MAJOR or MINOR
    pub change_kind: ChangeKind,
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub change_description: ChangeDescription,
    pub timestamp: DateTime<Utc>,
}

impl EntityCreatedEvent {
    pub fn new(
        entity_id: Uuid,
        entity_type: impl Into<String>,
        change_description: ChangeDescription,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            entity_id,
            entity_type: entity_type.into(),
            version: change_description.new_version,
            updated_by: None,
            change_description,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.updated_by = user;
        self
    }
}

impl EntityUpdatedEvent {
    pub fn new(
        entity_id: Uuid,
        entity_type: impl Into<String>,
        change_kind: ChangeKind,
        change_description: ChangeDescription,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            entity_id,
            entity_type: entity_type.into(),
            change_kind,
            version: change_description.new_version,
            updated_by: None,
            change_description,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.updated_by = user;
        self
    }
}
