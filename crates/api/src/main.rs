//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::Config;
use api::{CacheBackend, ScheduleBackend};
use dispatch::{
    ChannelBroadcaster, LogNotificationSender, NotificationRelay, RealtimeBroadcaster,
    RetryPolicy, notification_queue,
};
use metrics_exporter_prometheus::PrometheusHandle;
use schedule_store::{InMemoryStore, PostgresStore};
use slot_cache::InMemorySlotCache;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How long pending notifications may take to flush after shutdown.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Logs realtime events until the broadcaster is dropped.
///
/// Stands in for the WebSocket hub, which subscribes the same way.
fn spawn_event_log(broadcaster: &ChannelBroadcaster) {
    let mut rx = broadcaster.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(
                    event = event.name(),
                    provider_id = %event.provider_id(),
                    appointment_id = %event.appointment_id(),
                    "realtime event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "realtime event log lagging")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn serve<S: ScheduleBackend, C: CacheBackend>(
    config: &Config,
    store: S,
    cache: C,
    notifier: Arc<dyn NotificationRelay>,
    broadcaster: Arc<dyn RealtimeBroadcaster>,
    metrics_handle: PrometheusHandle,
) {
    let state = api::build_state(store, cache, notifier, broadcaster, config.scheduling());
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

fn describe_metrics() {
    metrics::describe_counter!("bookings_total", "Appointments committed");
    metrics::describe_counter!(
        "booking_conflicts_total",
        "Bookings and reschedules rejected for overlapping an existing appointment"
    );
    metrics::describe_histogram!(
        "booking_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent in a successful booking"
    );
    metrics::describe_counter!("slot_cache_hits_total", "Free-slot lookups served from cache");
    metrics::describe_counter!("slot_cache_misses_total", "Free-slot lookups recomputed");
    metrics::describe_counter!(
        "notifications_dropped_total",
        "Notifications discarded before delivery"
    );
    metrics::describe_counter!("notifications_delivered_total", "Notifications sent");
    metrics::describe_counter!(
        "notifications_failed_total",
        "Notifications that exhausted their retries"
    );
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Start side-effect delivery
    let (relay, worker) =
        notification_queue(config.notification_queue_capacity, RetryPolicy::default());
    let worker_handle = worker.spawn(LogNotificationSender);
    let notifier: Arc<dyn NotificationRelay> = Arc::new(relay);

    let channel = ChannelBroadcaster::new(config.realtime_channel_capacity);
    spawn_event_log(&channel);
    let broadcaster: Arc<dyn RealtimeBroadcaster> = Arc::new(channel);

    // 4. Connect backends and serve
    let store = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(
                url,
                config.database_max_connections,
                config.database_acquire_timeout(),
            )
            .await
            .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL schedule store");
            Some(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, appointments are kept in memory");
            None
        }
    };

    let cache = match &config.redis_url {
        Some(url) => api::connect_slot_cache(url, config.slot_cache_timeout()).await,
        None => {
            tracing::info!("REDIS_URL not set, using in-memory slot cache");
            None
        }
    };

    match (store, cache) {
        (Some(store), Some(cache)) => {
            serve(&config, store, cache, notifier, broadcaster, metrics_handle).await
        }
        (Some(store), None) => {
            let cache = InMemorySlotCache::new();
            serve(&config, store, cache, notifier, broadcaster, metrics_handle).await
        }
        (None, Some(cache)) => {
            let store = InMemoryStore::new();
            serve(&config, store, cache, notifier, broadcaster, metrics_handle).await
        }
        (None, None) => {
            let store = InMemoryStore::new();
            let cache = InMemorySlotCache::new();
            serve(&config, store, cache, notifier, broadcaster, metrics_handle).await
        }
    }

    // 5. The router (and every relay handle) is gone; let the worker flush.
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, worker_handle)
        .await
        .is_err()
    {
        tracing::warn!("notification worker did not drain before timeout");
    }

    tracing::info!("server shut down gracefully");
}
