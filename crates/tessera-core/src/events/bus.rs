//! Event bus using tokio broadcast channel
//!
//! Slow subscribers miss events rather than blocking the writer.

use crate::config::TesseraConfig;
use crate::events::EntityLifecycleEvent;
use tokio::sync::broadcast;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for entity lifecycle events
///
/// Events are fire-and-forget; with no subscribers they are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EntityLifecycleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create an event bus sized by `event_bus_capacity`.
    pub fn from_config(config: &TesseraConfig) -> Self {
        Self::with_capacity(config.event_bus_capacity)
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Emit an event to all subscribers. Never blocks or fails.
    pub fn emit(&self, event: EntityLifecycleEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber to event bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EntityLifecycleEvent>,
}

impl EventSubscriber {
    /// Receive the next event
    ///
    /// Returns None once the bus is dropped. Lagged events are skipped.
    pub async fn recv(&mut self) -> Option<EntityLifecycleEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event subscriber lagged");
                    continue;
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<EntityLifecycleEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EntityCreatedEvent;
    use crate::types::ChangeDescription;
    use uuid::Uuid;

    fn created(id: Uuid) -> EntityLifecycleEvent {
        EntityLifecycleEvent::Created(EntityCreatedEvent::new(
            id,
            "table",
            ChangeDescription::default(),
        ))
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let id = Uuid::new_v4();
        bus.emit(created(id));

        assert_eq!(sub1.recv().await.unwrap().entity_id(), id);
        assert_eq!(sub2.recv().await.unwrap().entity_id(), id);
    }

    #[test]
    fn test_no_subscribers_no_panic() {
        let bus = EventBus::with_capacity(4);
        bus.emit(created(Uuid::new_v4()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_ahead() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();

        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            bus.emit(created(*id));
        }

        // Only the newest two survive in a capacity-2 channel
        assert_eq!(sub.recv().await.unwrap().entity_id(), ids[3]);
        assert_eq!(sub.recv().await.unwrap().entity_id(), ids[4]);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_from_config_uses_configured_capacity() {
        let config = TesseraConfig::builder().event_bus_capacity(1).build();
        let bus = EventBus::from_config(&config);
        let mut sub = bus.subscribe();

        let last = Uuid::new_v4();
        bus.emit(created(Uuid::new_v4()));
        bus.emit(created(last));
        assert_eq!(tokio_test::block_on(sub.recv()).unwrap().entity_id(), last);
    }
}
