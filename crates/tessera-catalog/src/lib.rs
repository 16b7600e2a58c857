//! tessera-catalog - Catalog entity types built on tessera-core.
//!
//! - [`test_definition`]: the `testDefinition` entity type and its hooks
//! - [`report_data`]: analytics report data kept as extension records
//! - [`retry`]: bounded conflict retry for callers

pub mod report_data;
pub mod retry;
pub mod test_definition;

pub use report_data::{ReportData, ReportDataRepository, ReportDataType, REPORT_DATA_EXTENSION};
pub use retry::{submit_with_configured_retry, submit_with_retry};
pub use test_definition::{
    TestCaseParameter, TestDefinition, TestDefinitionHooks, TestDefinitionRepository,
    TestPlatform, TestTarget, TEST_DEFINITION,
};

use tessera_core::HookRegistry;

/// Hook registry with every catalog entity type registered.
pub fn catalog_hooks() -> HookRegistry {
    let mut registry = HookRegistry::new();
    test_definition::register(&mut registry);
    registry
}
