//! Fire-and-forget notification seam.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

pub const KIND_ACTIVITY_APPROVED: &str = "activity_approved";
pub const KIND_ACTIVITY_REJECTED: &str = "activity_rejected";
pub const KIND_LOW_STOCK: &str = "low_stock";

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

/// Delivery sink. Implementations must not block and must not fail the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
