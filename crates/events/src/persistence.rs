//! Durable notification persistence service.
//!
//! [`NotificationPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every notification event to the `notifications` table. It runs
//! as a long-lived background task and shuts down when the bus is dropped.

use tokio::sync::broadcast;

use pilelog_db::repositories::NotificationRepo;
use pilelog_db::DbPool;

use crate::bus::SiteEvent;

/// Background service that persists notifications to the database.
pub struct NotificationPersistence;

impl NotificationPersistence {
    /// Run the persistence loop until the channel closes.
    ///
    /// Non-notification events are ignored.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<SiteEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(notification) = event.as_notification() else {
                        continue;
                    };
                    if let Err(e) = NotificationRepo::create(&pool, &notification).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            user_id = notification.user_id,
                            "Failed to persist notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Notification persistence lagged, some notifications were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification persistence shutting down");
                    break;
                }
            }
        }
    }
}
