//! Per-field impact and equality rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How much a change to a field matters to readers of the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldImpact {
    /// Breaking: identity-defining or contract-changing fields
    Major,
    /// Cosmetic: descriptions, display names and the like
    #[default]
    Minor,
}

/// Equality used when deciding whether a field changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Deep equality over nested objects and arrays
    #[default]
    Structural,
    /// Arrays compare as multisets; anything else compares structurally
    Unordered,
}

impl Comparison {
    /// Whether two values are equal under this comparison.
    pub fn equal(self, a: &serde_json::Value, b: &serde_json::Value) -> bool {
        match (self, a, b) {
            (Comparison::Unordered, serde_json::Value::Array(a), serde_json::Value::Array(b)) => {
                unordered_eq(a, b)
            }
            _ => a == b,
        }
    }
}

fn unordered_eq(a: &[serde_json::Value], b: &[serde_json::Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        let slot = b
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && candidate == item);
        match slot {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Field classification table registered by an entity type.
///
/// Fields that are not registered are MINOR and compared structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPolicy {
    impacts: HashMap<String, FieldImpact>,
    comparisons: HashMap<String, Comparison>,
}

impl FieldPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: changes to `field` are breaking
    pub fn major(self, field: impl Into<String>) -> Self {
        self.with_impact(field, FieldImpact::Major)
    }

    /// Builder: changes to `field` are cosmetic
    pub fn minor(self, field: impl Into<String>) -> Self {
        self.with_impact(field, FieldImpact::Minor)
    }

    /// Builder: set the impact of a field
    pub fn with_impact(mut self, field: impl Into<String>, impact: FieldImpact) -> Self {
        self.impacts.insert(field.into(), impact);
        self
    }

    /// Builder: compare `field` as an order-insensitive list
    pub fn unordered(self, field: impl Into<String>) -> Self {
        self.with_comparison(field, Comparison::Unordered)
    }

    /// Builder: set the comparison of a field
    pub fn with_comparison(mut self, field: impl Into<String>, comparison: Comparison) -> Self {
        self.comparisons.insert(field.into(), comparison);
        self
    }

    /// Impact of a change to `field`.
    pub fn impact_of(&self, field: &str) -> FieldImpact {
        self.impacts.get(field).copied().unwrap_or_default()
    }

    /// Comparison used for `field`.
    pub fn comparison_of(&self, field: &str) -> Comparison {
        self.comparisons.get(field).copied().unwrap_or_default()
    }

    /// Whether `a` and `b` are equal values of `field`.
    pub fn equal(&self, field: &str, a: &serde_json::Value, b: &serde_json::Value) -> bool {
        self.comparison_of(field).equal(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unregistered_fields_are_minor_and_structural() {
        let policy = FieldPolicy::new();
        assert_eq!(policy.impact_of("description"), FieldImpact::Minor);
        assert_eq!(policy.comparison_of("tags"), Comparison::Structural);
    }

    #[test]
    fn test_builder_registers_rules() {
        let policy = FieldPolicy::new()
            .major("name")
            .minor("description")
            .unordered("tags");
        assert_eq!(policy.impact_of("name"), FieldImpact::Major);
        assert_eq!(policy.impact_of("description"), FieldImpact::Minor);
        assert_eq!(policy.comparison_of("tags"), Comparison::Unordered);
    }

    #[test]
    fn test_unordered_treats_arrays_as_multisets() {
        let cmp = Comparison::Unordered;
        assert!(cmp.equal(&json!(["a", "b", "c"]), &json!(["c", "a", "b"])));
        assert!(!cmp.equal(&json!(["a", "a", "b"]), &json!(["a", "b", "b"])));
        assert!(!cmp.equal(&json!(["a"]), &json!(["a", "a"])));
        assert!(cmp.equal(&json!({"k": 1}), &json!({"k": 1})));
    }

    #[test]
    fn test_structural_is_order_sensitive_for_arrays_only() {
        let cmp = Comparison::Structural;
        assert!(!cmp.equal(&json!(["a", "b"]), &json!(["b", "a"])));
        assert!(cmp.equal(&json!({"a": 1, "b": [1, 2]}), &json!({"b": [1, 2], "a": 1})));
    }
}
