//! Field-level diffing and change classification.

use std::collections::BTreeMap;

use crate::change::{Comparison, FieldImpact, FieldPolicy};
use crate::types::{ChangeDescription, ChangeKind, Entity, FieldChange, Fields, Version};

/// Structural diff of two entities, classified and versioned.
///
/// `previous_version` is the original's version and `new_version` the
/// version the classification implies.
pub fn diff(policy: &FieldPolicy, original: &Entity, updated: &Entity) -> ChangeDescription {
    let recorder = ChangeRecorder::from_diff(policy.clone(), &original.fields, &updated.fields);
    recorder.finish(original.version).0
}

/// Classify a change description under a policy.
pub fn classify(policy: &FieldPolicy, change: &ChangeDescription) -> ChangeKind {
    kind_of(policy, change.changed_fields())
}

fn kind_of<'a>(policy: &FieldPolicy, fields: impl Iterator<Item = &'a str>) -> ChangeKind {
    let mut kind = ChangeKind::NoChange;
    for field in fields {
        match policy.impact_of(field) {
            FieldImpact::Major => return ChangeKind::Major,
            FieldImpact::Minor => kind = ChangeKind::Minor,
        }
    }
    kind
}

/// Accumulates the changes of a single create or update.
///
/// Changes are keyed by field name, so recording a field twice replaces
/// the earlier entry rather than listing the field again.
#[derive(Debug, Clone)]
pub struct ChangeRecorder {
    policy: FieldPolicy,
    changes: BTreeMap<String, FieldChange>,
}

impl ChangeRecorder {
    /// Empty recorder.
    pub fn new(policy: FieldPolicy) -> Self {
        Self {
            policy,
            changes: BTreeMap::new(),
        }
    }

    /// Recorder seeded with the structural diff of two field maps.
    pub fn from_diff(policy: FieldPolicy, original: &Fields, updated: &Fields) -> Self {
        let mut recorder = Self::new(policy);
        for (name, old) in original {
            match updated.get(name) {
                Some(new) => recorder.compare(name, Some(old), Some(new), None),
                None => recorder.compare(name, Some(old), None, None),
            }
        }
        for (name, new) in updated {
            if !original.contains_key(name) {
                recorder.compare(name, None, Some(new), None);
            }
        }
        recorder
    }

    /// Recorder for a brand-new entity: every field is an addition.
    pub fn for_create(policy: FieldPolicy, fields: &Fields) -> Self {
        Self::from_diff(policy, &Fields::new(), fields)
    }

    /// Record a change to `name` using the policy's comparison for it.
    ///
    /// Equal values clear any change already recorded for the field.
    pub fn record_change(
        &mut self,
        name: &str,
        old: Option<&serde_json::Value>,
        new: Option<&serde_json::Value>,
    ) {
        self.compare(name, old, new, None);
    }

    /// Record a change to `name` with an explicit comparison.
    pub fn record_change_with(
        &mut self,
        name: &str,
        old: Option<&serde_json::Value>,
        new: Option<&serde_json::Value>,
        comparison: Comparison,
    ) {
        self.compare(name, old, new, Some(comparison));
    }

    fn compare(
        &mut self,
        name: &str,
        old: Option<&serde_json::Value>,
        new: Option<&serde_json::Value>,
        comparison: Option<Comparison>,
    ) {
        let comparison = comparison.unwrap_or_else(|| self.policy.comparison_of(name));
        let change = match (old, new) {
            (None, None) => None,
            (None, Some(new)) => Some(FieldChange::added(name, new.clone())),
            (Some(old), None) => Some(FieldChange::deleted(name, old.clone())),
            (Some(old), Some(new)) if comparison.equal(old, new) => None,
            (Some(old), Some(new)) => Some(FieldChange::updated(name, old.clone(), new.clone())),
        };
        match change {
            Some(change) => {
                self.changes.insert(name.to_string(), change);
            }
            None => {
                self.changes.remove(name);
            }
        }
    }

    /// Whether nothing has changed so far.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The change recorded for a field, if any.
    pub fn get(&self, name: &str) -> Option<&FieldChange> {
        self.changes.get(name)
    }

    /// Classification of the changes recorded so far.
    pub fn kind(&self) -> ChangeKind {
        kind_of(&self.policy, self.changes.keys().map(String::as_str))
    }

    /// Classify the update and produce its change description.
    pub fn finish(self, previous: Version) -> (ChangeDescription, ChangeKind) {
        let kind = self.kind();
        let mut description = self.into_description();
        description.previous_version = Some(previous);
        description.new_version = previous.bump(kind);
        (description, kind)
    }

    /// Produce the change description of a create.
    pub fn finish_created(self) -> ChangeDescription {
        let mut description = self.into_description();
        description.previous_version = None;
        description.new_version = Version::INITIAL;
        description
    }

    fn into_description(self) -> ChangeDescription {
        let mut description = ChangeDescription::default();
        for change in self.changes.into_values() {
            match (&change.old_value, &change.new_value) {
                (None, _) => description.fields_added.push(change),
                (Some(_), None) => description.fields_deleted.push(change),
                (Some(_), Some(_)) => description.fields_updated.push(change),
            }
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(fields: serde_json::Value) -> Entity {
        let mut entity = Entity::new("table");
        if let serde_json::Value::Object(map) = fields {
            entity.fields = map.into_iter().collect();
        }
        entity
    }

    #[test]
    fn test_diff_identical_is_no_change() {
        let e = entity(json!({"name": "orders", "columns": [{"name": "id"}]}));
        let change = diff(&FieldPolicy::new().major("name"), &e, &e);
        assert!(change.is_empty());
        assert_eq!(change.new_version, e.version);
        assert_eq!(classify(&FieldPolicy::new(), &change), ChangeKind::NoChange);
    }

    #[test]
    fn test_diff_sorts_into_lists() {
        let original = entity(json!({"name": "orders", "description": "old", "tags": ["pii"]}));
        let updated = entity(json!({"name": "orders", "description": "new", "owner": "ops"}));

        let change = diff(&FieldPolicy::new(), &original, &updated);
        assert_eq!(change.fields_added, vec![FieldChange::added("owner", json!("ops"))]);
        assert_eq!(
            change.fields_updated,
            vec![FieldChange::updated("description", json!("old"), json!("new"))]
        );
        assert_eq!(change.fields_deleted, vec![FieldChange::deleted("tags", json!(["pii"]))]);
    }

    #[test]
    fn test_diff_compares_nested_values_deeply() {
        let original = entity(json!({"schema": {"columns": [{"name": "id", "type": "INT"}]}}));
        let same = entity(json!({"schema": {"columns": [{"type": "INT", "name": "id"}]}}));
        let changed = entity(json!({"schema": {"columns": [{"name": "id", "type": "BIGINT"}]}}));

        assert!(diff(&FieldPolicy::new(), &original, &same).is_empty());
        assert_eq!(diff(&FieldPolicy::new(), &original, &changed).fields_updated.len(), 1);
    }

    #[test]
    fn test_minor_change_bumps_fraction() {
        let mut original = entity(json!({"name": "orders", "description": "old"}));
        original.version = Version::new(2, 3);
        let updated = entity(json!({"name": "orders", "description": "new"}));

        let change = diff(&FieldPolicy::new().major("name"), &original, &updated);
        assert_eq!(change.previous_version, Some(Version::new(2, 3)));
        assert_eq!(change.new_version, Version::new(2, 4));
    }

    #[test]
    fn test_major_change_wins_over_minor() {
        let mut original = entity(json!({"name": "orders", "description": "old"}));
        original.version = Version::new(1, 7);
        let updated = entity(json!({"name": "orders_v2", "description": "new"}));

        let policy = FieldPolicy::new().major("name");
        let change = diff(&policy, &original, &updated);
        assert_eq!(classify(&policy, &change), ChangeKind::Major);
        assert_eq!(change.new_version, Version::new(2, 0));
    }

    #[test]
    fn test_policy_comparison_applies_to_structural_diff() {
        let original = entity(json!({"tags": ["a", "b"]}));
        let updated = entity(json!({"tags": ["b", "a"]}));

        assert!(!diff(&FieldPolicy::new(), &original, &updated).is_empty());
        assert!(diff(&FieldPolicy::new().unordered("tags"), &original, &updated).is_empty());
    }

    #[test]
    fn test_record_change_replaces_structural_entry() {
        let original = entity(json!({"platforms": ["dbt", "OpenMetadata"]}));
        let updated = entity(json!({"platforms": ["OpenMetadata", "dbt"]}));

        let mut recorder =
            ChangeRecorder::from_diff(FieldPolicy::new(), &original.fields, &updated.fields);
        assert!(recorder.get("platforms").is_some());

        recorder.record_change_with(
            "platforms",
            original.field("platforms"),
            updated.field("platforms"),
            Comparison::Unordered,
        );
        assert!(recorder.is_empty());

        recorder.record_change("derived", None, Some(&json!(3)));
        recorder.record_change("derived", None, Some(&json!(4)));
        let (change, kind) = recorder.finish(Version::INITIAL);
        assert_eq!(change.fields_added, vec![FieldChange::added("derived", json!(4))]);
        assert_eq!(kind, ChangeKind::Minor);
    }

    #[test]
    fn test_for_create_lists_every_field_as_added() {
        let fields = entity(json!({"name": "orders", "description": "d"})).fields;
        let change = ChangeRecorder::for_create(FieldPolicy::new(), &fields).finish_created();
        assert_eq!(change.fields_added.len(), 2);
        assert_eq!(change.previous_version, None);
        assert_eq!(change.new_version, Version::INITIAL);
    }
}
