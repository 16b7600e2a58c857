//! tessera-core - Core library for tessera.
//!
//! This crate provides the generic machinery every catalog entity type is
//! persisted through: versioned entity storage with optimistic concurrency,
//! field-level change tracking with MAJOR/MINOR version bumps, and an
//! append-only, time-keyed extension store.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_core::{Database, Entity, EntityRepository, FieldPolicy, HookRegistry, PolicyHooks};
//!
//! let db = Database::open(&TesseraConfig::from_env()?)?;
//! let hooks = HookRegistry::new()
//!     .with("table", Arc::new(PolicyHooks::new(FieldPolicy::new().major("name"))));
//! let repo = EntityRepository::with_database(&db, hooks);
//!
//! let created = repo
//!     .submit("table", Entity::new("table").with_field("name", json!("orders")), None)
//!     .await?;
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod events;
pub mod extension;
pub mod repository;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use change::{ChangeRecorder, Comparison, FieldImpact, FieldPolicy};
pub use config::{RetryPolicy, TesseraConfig};
pub use error::{ErrorCode, TesseraError, TesseraResult};
pub use events::{EntityLifecycleEvent, EventBus, EventSubscriber};
pub use extension::ExtensionLog;
pub use repository::{EntityRepository, HookRegistry, PolicyHooks, SubmitResult};
pub use store::{Database, SqliteEntityStore, SqliteExtensionStore};
pub use traits::{EntityHooks, EntityStore, ExtensionStore};
pub use types::{
    ChangeDescription, ChangeKind, Entity, ExtensionRecord, FieldChange, Fields, HistoryEntry,
    Paging, ResultList, Version, VersionRecord,
};
