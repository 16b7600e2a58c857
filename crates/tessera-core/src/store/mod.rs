//! SQLite implementations of the storage traits.
//!
//! All stores share one [`Database`] handle so they see the same file and
//! serialise on the same connection.

mod database;
mod entity;
mod extension;

pub use database::Database;
pub use entity::SqliteEntityStore;
pub use extension::SqliteExtensionStore;
