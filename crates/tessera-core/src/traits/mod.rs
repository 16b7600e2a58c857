//! Core traits: storage backends and per-entity-type hooks.

mod entity_store;
mod extension_store;
mod hooks;

pub use entity_store::*;
pub use extension_store::*;
pub use hooks::*;
