//! Bounded notification queue and its background worker.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::notification::{Notification, NotificationRelay, NotificationSender};

/// How many times the worker tries to deliver one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Creates a relay and the worker that drains it.
///
/// The queue holds at most `capacity` pending notifications. When it is full
/// new notifications are dropped with a warning so that callers never wait.
pub fn notification_queue(
    capacity: usize,
    policy: RetryPolicy,
) -> (QueuedNotificationRelay, NotificationWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueuedNotificationRelay { tx },
        NotificationWorker { rx, policy },
    )
}

/// [`NotificationRelay`] backed by a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct QueuedNotificationRelay {
    tx: mpsc::Sender<Notification>,
}

impl NotificationRelay for QueuedNotificationRelay {
    fn enqueue(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                metrics::counter!("notifications_dropped_total", "reason" => "full").increment(1);
                warn!(user_id = %n.user_id, "Notification queue full, dropping notification");
            }
            Err(TrySendError::Closed(n)) => {
                metrics::counter!("notifications_dropped_total", "reason" => "closed")
                    .increment(1);
                warn!(user_id = %n.user_id, "Notification worker stopped, dropping notification");
            }
        }
    }
}

/// Drains the queue, delivering each notification through a [`NotificationSender`].
pub struct NotificationWorker {
    rx: mpsc::Receiver<Notification>,
    policy: RetryPolicy,
}

impl NotificationWorker {
    /// Runs until every relay handle has been dropped and the queue is empty.
    pub async fn run<S: NotificationSender>(mut self, sender: S) {
        debug!("Notification worker started");
        while let Some(notification) = self.rx.recv().await {
            deliver(&sender, &notification, self.policy).await;
        }
        debug!("Notification worker stopped");
    }

    /// Spawns [`run`](Self::run) onto the current runtime.
    pub fn spawn<S: NotificationSender + 'static>(self, sender: S) -> JoinHandle<()> {
        tokio::spawn(self.run(sender))
    }
}

async fn deliver<S: NotificationSender>(
    sender: &S,
    notification: &Notification,
    policy: RetryPolicy,
) {
    let mut backoff = policy.initial_backoff;
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match sender.send(notification).await {
            Ok(()) => {
                metrics::counter!("notifications_delivered_total").increment(1);
                return;
            }
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "Notification delivery failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                error!(
                    user_id = %notification.user_id,
                    attempts,
                    error = %e,
                    "Giving up on notification"
                );
            }
        }
    }
}
