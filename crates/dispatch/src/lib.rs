//! Side effects of booking mutations.
//!
//! Both hand-offs are synchronous and never block the caller:
//!
//! - [`NotificationRelay::enqueue`] pushes onto a bounded queue drained by a
//!   background [`NotificationWorker`] with bounded retries.
//! - [`RealtimeBroadcaster::publish`] fans a [`BookingEvent`] out to whoever
//!   is currently subscribed, with no delivery guarantee.

pub mod broadcast;
pub mod error;
pub mod events;
pub mod notification;
pub mod queue;

pub use broadcast::{ChannelBroadcaster, InMemoryBroadcaster, RealtimeBroadcaster};
pub use error::DispatchError;
pub use events::BookingEvent;
pub use notification::{
    InMemoryNotificationRelay, InMemoryNotificationSender, LogNotificationSender, Notification,
    NotificationRelay, NotificationSender,
};
pub use queue::{NotificationWorker, QueuedNotificationRelay, RetryPolicy, notification_queue};
