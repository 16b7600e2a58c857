//! Change descriptions produced by the change recorder.

use serde::{Deserialize, Serialize};

use crate::types::Version;

/// Severity of an update, in the order the orchestrator applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// First version of a new entity
    Created,
    /// At least one breaking field changed
    Major,
    /// Only non-breaking fields changed
    Minor,
    /// Proposed state equals the stored state
    NoChange,
}

impl ChangeKind {
    /// Convert to string for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::NoChange => "no_change",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "no_change" => Some(Self::NoChange),
            _ => None,
        }
    }
}

/// A single field-level change.
///
/// Additions carry only `new_value`, deletions only `old_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

impl FieldChange {
    pub fn added(name: impl Into<String>, new_value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            old_value: None,
            new_value: Some(new_value),
        }
    }

    pub fn updated(
        name: impl Into<String>,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            old_value: Some(old_value),
            new_value: Some(new_value),
        }
    }

    pub fn deleted(name: impl Into<String>, old_value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            old_value: Some(old_value),
            new_value: None,
        }
    }
}

/// Auditable record of what one update changed.
///
/// A field name appears in at most one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDescription {
    #[serde(default)]
    pub fields_added: Vec<FieldChange>,
    #[serde(default)]
    pub fields_updated: Vec<FieldChange>,
    #[serde(default)]
    pub fields_deleted: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<Version>,
    pub new_version: Version,
}

impl ChangeDescription {
    /// True when no field was added, updated or deleted.
    pub fn is_empty(&self) -> bool {
        self.fields_added.is_empty()
            && self.fields_updated.is_empty()
            && self.fields_deleted.is_empty()
    }

    /// Names of every field touched by this change, in list order.
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.fields_added
            .iter()
            .chain(&self.fields_updated)
            .chain(&self.fields_deleted)
            .map(|c| c.name.as_str())
    }

    /// Look up the change recorded for a field, if any.
    pub fn find(&self, name: &str) -> Option<&FieldChange> {
        self.fields_added
            .iter()
            .chain(&self.fields_updated)
            .chain(&self.fields_deleted)
            .find(|c| c.name == name)
    }
}
