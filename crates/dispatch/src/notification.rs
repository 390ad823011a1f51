//! Notification relay and sender traits with in-memory implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DispatchError, Result};

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub message: String,
}

impl Notification {
    pub fn new(user_id: UserId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
        }
    }
}

/// Accepts notifications for asynchronous delivery.
///
/// `enqueue` must return promptly without waiting on delivery. Delivery is
/// at-least-once: a receiver may see a notification twice but a notification
/// accepted by the relay is retried until the retry budget runs out.
pub trait NotificationRelay: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

/// Performs the actual delivery of one notification (email, SMS, push).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Sender that only logs. Stands in for an email gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            user_id = %notification.user_id,
            message = %notification.message,
            "Email Sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemorySenderState {
    sent: Vec<Notification>,
    attempts: usize,
    failures_remaining: usize,
}

/// In-memory sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSender {
    state: Arc<RwLock<InMemorySenderState>>,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the next `count` send attempts to fail.
    pub fn fail_next(&self, count: usize) {
        self.state.write().unwrap().failures_remaining = count;
    }

    /// Notifications delivered so far, in delivery order.
    pub fn sent(&self) -> Vec<Notification> {
        self.state.read().unwrap().sent.clone()
    }

    /// Total send attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.state.read().unwrap().attempts
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.attempts += 1;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(DispatchError::Delivery {
                user_id: notification.user_id,
                reason: "Gateway rejected message".to_string(),
            });
        }

        state.sent.push(notification.clone());
        Ok(())
    }
}

/// Relay that records notifications synchronously, for testing callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationRelay {
    enqueued: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<Notification> {
        self.enqueued.read().unwrap().clone()
    }

    /// Notifications addressed to `user_id`.
    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        self.enqueued
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl NotificationRelay for InMemoryNotificationRelay {
    fn enqueue(&self, notification: Notification) {
        self.enqueued.write().unwrap().push(notification);
    }
}
