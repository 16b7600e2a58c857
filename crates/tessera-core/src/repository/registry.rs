//! Entity type to hooks lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::change::FieldPolicy;
use crate::error::{TesseraError, TesseraResult};
use crate::traits::EntityHooks;
use crate::types::Entity;

/// One hooks implementation per registered entity type.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn EntityHooks>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register hooks for an entity type, replacing any earlier registration.
    pub fn register(&mut self, entity_type: impl Into<String>, hooks: Arc<dyn EntityHooks>) {
        let entity_type = entity_type.into();
        tracing::debug!(entity_type = %entity_type, "Registered entity hooks");
        self.hooks.insert(entity_type, hooks);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, entity_type: impl Into<String>, hooks: Arc<dyn EntityHooks>) -> Self {
        self.register(entity_type, hooks);
        self
    }

    /// Hooks for an entity type.
    pub fn get(&self, entity_type: &str) -> TesseraResult<Arc<dyn EntityHooks>> {
        self.hooks
            .get(entity_type)
            .cloned()
            .ok_or_else(|| TesseraError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.hooks.contains_key(entity_type)
    }

    /// Registered entity types, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Hooks that accept every entity and only contribute a field policy.
///
/// For entity types with no validation or relationships of their own.
#[derive(Debug, Clone, Default)]
pub struct PolicyHooks {
    policy: FieldPolicy,
}

impl PolicyHooks {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl EntityHooks for PolicyHooks {
    async fn validate(&self, _entity: &Entity) -> TesseraResult<()> {
        Ok(())
    }

    fn field_policy(&self) -> FieldPolicy {
        self.policy.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::FieldImpact;

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = HookRegistry::new().with("table", Arc::new(PolicyHooks::default()));
        assert!(registry.contains("table"));
        assert!(registry.get("table").is_ok());

        let err = registry.get("dashboard").err().unwrap();
        assert!(matches!(err, TesseraError::UnknownEntityType(ref t) if t == "dashboard"));
    }

    #[test]
    fn test_register_replaces_and_lists_sorted() {
        let mut registry = HookRegistry::new();
        registry.register("topic", Arc::new(PolicyHooks::default()));
        registry.register("table", Arc::new(PolicyHooks::default()));
        registry.register(
            "table",
            Arc::new(PolicyHooks::new(FieldPolicy::new().major("name"))),
        );

        assert_eq!(registry.entity_types(), vec!["table", "topic"]);
        let policy = registry.get("table").unwrap().field_policy();
        assert_eq!(policy.impact_of("name"), FieldImpact::Major);
    }
}
