use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::models::task::OrchestrationTask;

/// Broadcast publisher for scheduler lifecycle events.
///
/// Consumers subscribe for status-change notifications (the streaming
/// surface is a thin projection over these plus task polling). Publishing
/// with zero subscribers is a success, not an error.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // send() errors only when there are no subscribers, which is an
        // acceptable state for lifecycle notifications
        let _ = self.sender.send(event);
    }

    /// Publish a lifecycle event with the standard task context
    pub fn publish_task_event(&self, event_name: &str, task: &OrchestrationTask) {
        self.publish(
            event_name,
            json!({
                "taskUuid": task.task_uuid,
                "teamId": task.team_id,
                "status": task.status,
                "retryCount": task.retry_count,
            }),
        );
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
