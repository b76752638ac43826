//! Load event notifications
//!
//! Each loader instance publishes one event per dependency that reaches
//! the end of its pipeline, successful or not. Subscribers receive events
//! through a `tokio::sync::broadcast` channel; events published while
//! nobody listens are dropped.

use tokio::sync::broadcast;
use tracing::debug;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 64;

/// Event published when a dependency finishes loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// Instances were recorded in the registry
    Registered {
        name: Option<String>,
        instances: usize,
    },
    /// The dependency failed and nothing was recorded
    Failed { name: Option<String>, reason: String },
}

impl LoadEvent {
    /// Name of the dependency the event is about
    pub fn name(&self) -> Option<&str> {
        match self {
            LoadEvent::Registered { name, .. } | LoadEvent::Failed { name, .. } => {
                name.as_deref()
            }
        }
    }
}

/// Event publisher for one loader instance
#[derive(Debug, Clone)]
pub struct EventManager {
    sender: broadcast::Sender<LoadEvent>,
}

impl EventManager {
    /// Create a new event manager
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to current subscribers
    pub fn publish(&self, event: LoadEvent) {
        debug!("Publishing load event: {:?}", event);
        if self.sender.send(event).is_err() {
            debug!("No load event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let events = EventManager::new();
        let mut rx = events.subscribe();
        assert_eq!(events.subscriber_count(), 1);

        events.publish(LoadEvent::Registered {
            name: Some("datepicker".to_string()),
            instances: 1,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), Some("datepicker"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let events = EventManager::new();
        events.publish(LoadEvent::Failed {
            name: None,
            reason: "boom".to_string(),
        });
        assert_eq!(events.subscriber_count(), 0);
    }
}
