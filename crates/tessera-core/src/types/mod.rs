//! Core types for tessera.

mod change;
mod entity;
mod extension;
mod version;

pub use change::{ChangeDescription, ChangeKind, FieldChange};
pub use entity::{Entity, Fields, HistoryEntry, VersionRecord};
pub use extension::{ExtensionRecord, Paging, ResultList};
pub use version::Version;
