//! Generic, schema-agnostic entity representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{TesseraError, TesseraResult};
use crate::types::{ChangeDescription, ChangeKind, Version};

/// Open mapping from field name to structured value.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// A versioned, identity-bearing catalog record.
///
/// Only `fields` is user data. The identity, version and audit fields are
/// maintained by the repository and never diffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Assigned on first persist when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Type tag, e.g. "testDefinition"
    pub entity_type: String,
    #[serde(default)]
    pub version: Version,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Change that produced the current version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<ChangeDescription>,
    #[serde(default)]
    pub fields: Fields,
}

impl Entity {
    /// Create an unsaved entity of the given type with no fields.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            id: None,
            entity_type: entity_type.into(),
            version: Version::INITIAL,
            updated_at: Utc::now(),
            updated_by: None,
            change_description: None,
            fields: Fields::new(),
        }
    }

    /// Builder: pre-set the identity
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder: set a field
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Builder: record who proposed this state
    pub fn updated_by(mut self, user: impl Into<String>) -> Self {
        self.updated_by = Some(user.into());
        self
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Get a field value as a string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|v| v.as_str())
    }

    /// Set a field, returning the previous value.
    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.fields.insert(name.into(), value)
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<serde_json::Value> {
        self.fields.remove(name)
    }

    /// The identity of a persisted entity.
    pub fn require_id(&self) -> TesseraResult<Uuid> {
        self.id.ok_or_else(|| {
            TesseraError::missing_field("id", format!("{} has no id assigned", self.entity_type))
        })
    }
}

/// Immutable snapshot of an entity at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub entity_id: Uuid,
    pub entity_type: String,
    pub version: Version,
    pub snapshot: Entity,
    pub change_description: ChangeDescription,
    pub change_kind: ChangeKind,
    pub recorded_at: DateTime<Utc>,
}

impl VersionRecord {
    /// Build the record for a snapshot that is about to be persisted.
    pub fn for_snapshot(snapshot: &Entity, kind: ChangeKind) -> TesseraResult<Self> {
        let change_description = snapshot.change_description.clone().unwrap_or_else(|| {
            ChangeDescription {
                new_version: snapshot.version,
                ..Default::default()
            }
        });
        Ok(Self {
            entity_id: snapshot.require_id()?,
            entity_type: snapshot.entity_type.clone(),
            version: snapshot.version,
            snapshot: snapshot.clone(),
            change_description,
            change_kind: kind,
            recorded_at: snapshot.updated_at,
        })
    }

    /// Condense into a history entry.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            version: self.version,
            change_kind: self.change_kind,
            change_description: self.change_description.clone(),
            timestamp: self.recorded_at,
        }
    }
}

/// One line of an entity's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub version: Version,
    pub change_kind: ChangeKind,
    pub change_description: ChangeDescription,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_accessors() {
        let id = Uuid::new_v4();
        let mut entity = Entity::new("table")
            .with_id(id)
            .with_field("name", json!("orders"))
            .updated_by("admin");

        assert_eq!(entity.require_id().unwrap(), id);
        assert_eq!(entity.get_string("name"), Some("orders"));
        assert_eq!(entity.version, Version::INITIAL);
        assert_eq!(entity.updated_by.as_deref(), Some("admin"));

        assert_eq!(entity.set_field("name", json!("orders_v2")), Some(json!("orders")));
        assert_eq!(entity.remove_field("name"), Some(json!("orders_v2")));
        assert!(entity.field("name").is_none());
    }

    #[test]
    fn test_require_id_without_identity() {
        let entity = Entity::new("table");
        assert!(entity.require_id().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let entity = Entity::new("testDefinition")
            .with_id(Uuid::new_v4())
            .with_field("testPlatforms", json!(["OpenMetadata"]));

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entityType"], json!("testDefinition"));
        assert_eq!(json["version"], json!("1.0"));

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_version_record_defaults_change_description() {
        let entity = Entity::new("table").with_id(Uuid::new_v4());
        let record = VersionRecord::for_snapshot(&entity, ChangeKind::Created).unwrap();
        assert_eq!(record.change_description.new_version, Version::INITIAL);
        assert!(record.change_description.is_empty());
        assert_eq!(record.to_history_entry().change_kind, ChangeKind::Created);
    }
}
