//! Realtime fan-out of booking events.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::BookingEvent;

/// Publishes events to live subscribers. Never blocks and never fails the caller.
pub trait RealtimeBroadcaster: Send + Sync {
    fn publish(&self, event: BookingEvent);
}

/// Broadcaster over a `tokio::sync::broadcast` channel.
///
/// Subscribers that fall more than `capacity` events behind lose the oldest
/// ones. Publishing with no subscribers discards the event.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<BookingEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl RealtimeBroadcaster for ChannelBroadcaster {
    fn publish(&self, event: BookingEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!(event = name, "No realtime subscribers");
        }
    }
}

/// Broadcaster that records events, for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroadcaster {
    published: Arc<RwLock<Vec<BookingEvent>>>,
}

impl InMemoryBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<BookingEvent> {
        self.published.read().unwrap().clone()
    }
}

impl RealtimeBroadcaster for InMemoryBroadcaster {
    fn publish(&self, event: BookingEvent) {
        self.published.write().unwrap().push(event);
    }
}
