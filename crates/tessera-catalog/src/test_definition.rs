//! Data quality test definitions.
//!
//! A test definition describes a reusable check (its parameters, the
//! platforms that can run it and the column types it applies to). It is
//! stored as a generic entity of type [`TEST_DEFINITION`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tessera_core::{
    ChangeRecorder, Comparison, Entity, EntityHooks, EntityRepository, FieldPolicy, HookRegistry,
    SubmitResult, TesseraError, TesseraResult, Version,
};

/// Entity type tag for test definitions.
pub const TEST_DEFINITION: &str = "testDefinition";

/// What a test definition can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestTarget {
    Table,
    Column,
}

/// Engines able to execute a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestPlatform {
    OpenMetadata,
    GreatExpectations,
    #[serde(rename = "DBT")]
    Dbt,
    Deequ,
    Soda,
    Other,
}

/// One parameter a test case must or may supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Typed view of a `testDefinition` entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entity_type: TestTarget,
    #[serde(default)]
    pub test_platforms: Vec<TestPlatform>,
    #[serde(default)]
    pub supported_data_types: Vec<String>,
    #[serde(default)]
    pub parameter_definition: Vec<TestCaseParameter>,
}

impl TestDefinition {
    pub fn new(name: impl Into<String>, entity_type: TestTarget) -> Self {
        Self {
            id: None,
            name: name.into(),
            display_name: None,
            description: None,
            entity_type,
            test_platforms: Vec::new(),
            supported_data_types: Vec::new(),
            parameter_definition: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = TestPlatform>) -> Self {
        self.test_platforms = platforms.into_iter().collect();
        self
    }

    pub fn with_data_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.supported_data_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, parameter: TestCaseParameter) -> Self {
        self.parameter_definition.push(parameter);
        self
    }

    /// Generic entity carrying this definition's fields.
    pub fn to_entity(&self) -> TesseraResult<Entity> {
        let mut entity = Entity::new(TEST_DEFINITION);
        entity.id = self.id;
        if let serde_json::Value::Object(map) = serde_json::to_value(self)? {
            entity.fields = map.into_iter().filter(|(k, _)| k != "id").collect();
        }
        Ok(entity)
    }

    /// Typed view of a generic entity.
    pub fn from_entity(entity: &Entity) -> TesseraResult<Self> {
        if entity.entity_type != TEST_DEFINITION {
            return Err(TesseraError::validation(format!(
                "expected a {} entity, got {}",
                TEST_DEFINITION, entity.entity_type
            )));
        }
        let fields: serde_json::Map<String, serde_json::Value> = entity
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut definition: Self = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| TesseraError::validation(format!("invalid test definition: {}", e)))?;
        definition.id = entity.id;
        Ok(definition)
    }
}

/// Hooks for the `testDefinition` entity type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestDefinitionHooks;

#[async_trait]
impl EntityHooks for TestDefinitionHooks {
    async fn validate(&self, entity: &Entity) -> TesseraResult<()> {
        let has_platforms = entity
            .field("testPlatforms")
            .and_then(|v| v.as_array())
            .is_some_and(|platforms| !platforms.is_empty());
        if !has_platforms {
            return Err(TesseraError::missing_field(
                "testPlatforms",
                "testPlatforms must not be empty",
            ));
        }
        TestDefinition::from_entity(entity).map(|_| ())
    }

    fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::new()
            .major("name")
            .major("entityType")
            .unordered("testPlatforms")
            .unordered("supportedDataTypes")
    }

    fn entity_specific_update(
        &self,
        recorder: &mut ChangeRecorder,
        original: &Entity,
        updated: &Entity,
    ) {
        for field in ["testPlatforms", "supportedDataTypes"] {
            recorder.record_change_with(
                field,
                original.field(field),
                updated.field(field),
                Comparison::Unordered,
            );
        }
        recorder.record_change(
            "parameterDefinition",
            original.field("parameterDefinition"),
            updated.field("parameterDefinition"),
        );
    }
}

/// Register the test definition hooks.
pub fn register(registry: &mut HookRegistry) {
    registry.register(TEST_DEFINITION, Arc::new(TestDefinitionHooks));
}

/// Typed access to test definitions through an [`EntityRepository`].
pub struct TestDefinitionRepository {
    repo: Arc<EntityRepository>,
}

impl TestDefinitionRepository {
    /// The repository must have [`TestDefinitionHooks`] registered.
    pub fn new(repo: Arc<EntityRepository>) -> TesseraResult<Self> {
        repo.hooks().get(TEST_DEFINITION)?;
        Ok(Self { repo })
    }

    /// Create or update a definition.
    pub async fn create_or_update(
        &self,
        definition: &TestDefinition,
        expected_version: Option<Version>,
    ) -> TesseraResult<(TestDefinition, SubmitResult)> {
        let result = self
            .repo
            .submit(TEST_DEFINITION, definition.to_entity()?, expected_version)
            .await?;
        Ok((TestDefinition::from_entity(&result.entity)?, result))
    }

    pub async fn get(&self, id: Uuid) -> TesseraResult<TestDefinition> {
        TestDefinition::from_entity(&self.repo.fetch(TEST_DEFINITION, id).await?)
    }

    pub async fn list(&self) -> TesseraResult<Vec<TestDefinition>> {
        self.repo
            .list(TEST_DEFINITION)
            .await?
            .iter()
            .map(TestDefinition::from_entity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::{ChangeKind, ErrorCode, FieldImpact};

    fn column_values_between() -> TestDefinition {
        TestDefinition::new("columnValuesToBeBetween", TestTarget::Column)
            .with_description("Values fall within a range")
            .with_platforms([TestPlatform::OpenMetadata, TestPlatform::GreatExpectations])
            .with_data_types(["INT", "BIGINT"])
            .with_parameter(TestCaseParameter {
                name: "minValue".to_string(),
                display_name: None,
                data_type: Some("INT".to_string()),
                description: None,
                required: false,
            })
    }

    #[test]
    fn test_entity_conversion_keeps_wire_names() {
        let definition = column_values_between();
        let entity = definition.to_entity().unwrap();

        assert_eq!(entity.entity_type, TEST_DEFINITION);
        assert_eq!(entity.field("entityType"), Some(&json!("COLUMN")));
        assert_eq!(
            entity.field("testPlatforms"),
            Some(&json!(["OpenMetadata", "GreatExpectations"]))
        );
        assert!(entity.field("displayName").is_none());
        assert_eq!(TestDefinition::from_entity(&entity).unwrap(), definition);
    }

    #[test]
    fn test_empty_platforms_are_rejected() {
        let hooks = TestDefinitionHooks;
        let mut definition = column_values_between();
        definition.test_platforms.clear();

        let entity = definition.to_entity().unwrap();
        let err = tokio_test::block_on(hooks.validate(&entity)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
        assert!(err.to_string().contains("testPlatforms must not be empty"));

        let mut entity = column_values_between().to_entity().unwrap();
        entity.remove_field("testPlatforms");
        tokio_test::assert_err!(tokio_test::block_on(hooks.validate(&entity)));

        let entity = column_values_between().to_entity().unwrap();
        tokio_test::assert_ok!(tokio_test::block_on(hooks.validate(&entity)));
    }

    #[test]
    fn test_policy_marks_identity_fields_major() {
        let policy = TestDefinitionHooks.field_policy();
        assert_eq!(policy.impact_of("name"), FieldImpact::Major);
        assert_eq!(policy.impact_of("entityType"), FieldImpact::Major);
        assert_eq!(policy.impact_of("description"), FieldImpact::Minor);
        assert_eq!(policy.impact_of("testPlatforms"), FieldImpact::Minor);
    }

    #[test]
    fn test_specific_update_ignores_platform_order() {
        let original = column_values_between().to_entity().unwrap();
        let mut updated = original.clone();
        updated.set_field("testPlatforms", json!(["GreatExpectations", "OpenMetadata"]));
        updated.set_field("supportedDataTypes", json!(["BIGINT", "INT", "DECIMAL"]));

        let hooks = TestDefinitionHooks;
        let mut recorder =
            ChangeRecorder::from_diff(FieldPolicy::new(), &original.fields, &updated.fields);
        hooks.entity_specific_update(&mut recorder, &original, &updated);

        assert!(recorder.get("testPlatforms").is_none());
        assert!(recorder.get("supportedDataTypes").is_some());
        assert_eq!(recorder.kind(), ChangeKind::Minor);
    }
}
