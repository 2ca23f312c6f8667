//! Broadcast hub for site events.
//!
//! The engine only knows the [`NotificationSink`](pilelog_core::notify::NotificationSink)
//! trait; [`BusNotifier`](crate::BusNotifier) turns each notification into a
//! [`SiteEvent`] here, and any number of background consumers subscribe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use pilelog_core::notify::Notification;

/// Event type prefix for user notifications, e.g. `notification.low_stock`.
pub const NOTIFICATION_PREFIX: &str = "notification.";

const DEFAULT_CAPACITY: usize = 1024;

/// Something that happened on a site, fanned out to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct SiteEvent {
    /// Dot-separated name, e.g. `notification.activity_approved`.
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl SiteEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Wrap a user notification as a `notification.<kind>` event.
    pub fn notification(notification: &Notification) -> Self {
        let payload = serde_json::to_value(notification).unwrap_or_default();
        Self::new(format!("{NOTIFICATION_PREFIX}{}", notification.kind), payload)
    }

    /// The notification carried by a `notification.*` event, if any.
    pub fn as_notification(&self) -> Option<Notification> {
        if !self.event_type.starts_with(NOTIFICATION_PREFIX) {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// In-process fan-out over `tokio::sync::broadcast`, shared as `Arc<EventBus>`.
///
/// A full buffer drops the oldest events; slow receivers see
/// `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<SiteEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers. With none, the event is dropped.
    pub fn publish(&self, event: SiteEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SiteEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
