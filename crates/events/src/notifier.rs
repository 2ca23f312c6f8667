//! [`NotificationSink`] that publishes onto the [`EventBus`].

use std::sync::Arc;

use pilelog_core::notify::{Notification, NotificationSink};

use crate::bus::{EventBus, SiteEvent};

/// Fire-and-forget delivery: publishing never blocks and never fails.
#[derive(Clone)]
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl NotificationSink for BusNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(
            user_id = notification.user_id,
            kind = %notification.kind,
            "Publishing notification"
        );
        self.bus.publish(SiteEvent::notification(&notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilelog_core::notify::KIND_ACTIVITY_APPROVED;

    #[tokio::test]
    async fn notify_publishes_notification_event() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let notifier = BusNotifier::new(Arc::clone(&bus));

        notifier.notify(Notification {
            user_id: 5,
            kind: KIND_ACTIVITY_APPROVED.to_string(),
            title: "Activity approved".into(),
            message: "a1 was approved".into(),
            data: serde_json::json!({"activityId": "a1"}),
        });

        let event = rx.recv().await.expect("should receive the event");
        assert_eq!(event.event_type, "notification.activity_approved");
        let n = event.as_notification().expect("payload is a notification");
        assert_eq!(n.user_id, 5);
        assert_eq!(n.data["activityId"], "a1");
    }
}
