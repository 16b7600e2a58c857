//! Lifecycle events for persisted creates and updates
//!
//! - Event types carrying the change description
//! - Broadcast event bus for in-process subscribers

mod bus;
mod event;

pub use bus::{EventBus, EventSubscriber};
pub use event::{EntityCreatedEvent, EntityLifecycleEvent, EntityUpdatedEvent};
