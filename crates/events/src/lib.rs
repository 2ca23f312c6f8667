//! Event fan-out and notification persistence.
//!
//! [`BusNotifier`] is the engine's notification sink. It publishes onto the
//! [`EventBus`], and [`NotificationPersistence`] drains the bus into the
//! `notifications` table.

pub mod bus;
pub mod notifier;
pub mod persistence;

pub use bus::{EventBus, SiteEvent};
pub use notifier::BusNotifier;
pub use persistence::NotificationPersistence;
