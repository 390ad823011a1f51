//! Integration tests for the notification queue and realtime broadcaster.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{AppointmentId, UserId};
use dispatch::{
    BookingEvent, ChannelBroadcaster, InMemoryNotificationSender, Notification,
    NotificationRelay, RealtimeBroadcaster, RetryPolicy, notification_queue,
};

#[tokio::test]
async fn spawned_worker_drains_queue_from_many_tasks() {
    let (relay, worker) = notification_queue(
        100,
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        },
    );
    let sender = InMemoryNotificationSender::new();
    let handle = worker.spawn(sender.clone());

    let relay: Arc<dyn NotificationRelay> = Arc::new(relay);
    let mut tasks = Vec::new();
    for i in 0..10 {
        let relay = relay.clone();
        tasks.push(tokio::spawn(async move {
            relay.enqueue(Notification::new(UserId::new(), format!("message {i}")));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    drop(relay);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop once relays are dropped")
        .unwrap();

    assert_eq!(sender.sent().len(), 10);
}

#[tokio::test]
async fn broadcaster_behind_trait_object_reaches_subscriber() {
    let channel = ChannelBroadcaster::new(16);
    let mut rx = channel.subscribe();
    let broadcaster: Arc<dyn RealtimeBroadcaster> = Arc::new(channel);

    let provider = UserId::new();
    broadcaster.publish(BookingEvent::NewBooking {
        appointment_id: AppointmentId::new(),
        provider_id: provider,
        customer_id: UserId::new(),
        slot: Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap(),
    });

    let received = rx.recv().await.unwrap();
    assert_eq!(received.name(), "new_booking");
    assert_eq!(received.provider_id(), provider);
}
