//! HTTP API server with observability for the scheduling engine.
//!
//! Provides REST endpoints for booking, cancelling and rescheduling
//! appointments and for provider availability, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use dispatch::{NotificationRelay, RealtimeBroadcaster};
use domain::{AvailabilityEngine, BookingEngine, SchedulingConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use schedule_store::{AppointmentStore, ProviderScheduleStore};
use slot_cache::{RedisSlotCache, SlotCache};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Appointment and availability storage usable behind the router.
pub trait ScheduleBackend: AppointmentStore + ProviderScheduleStore + Clone + 'static {}

impl<T> ScheduleBackend for T where T: AppointmentStore + ProviderScheduleStore + Clone + 'static {}

/// Slot cache usable behind the router.
pub trait CacheBackend: SlotCache + Clone + 'static {}

impl<T> CacheBackend for T where T: SlotCache + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S, C> {
    pub booking: BookingEngine<S, C>,
    pub availability: AvailabilityEngine<S, C>,
}

/// Wires both engines over one store and one cache.
pub fn build_state<S: ScheduleBackend, C: CacheBackend>(
    store: S,
    cache: C,
    notifier: Arc<dyn NotificationRelay>,
    broadcaster: Arc<dyn RealtimeBroadcaster>,
    config: SchedulingConfig,
) -> Arc<AppState<S, C>> {
    Arc::new(AppState {
        booking: BookingEngine::new(store.clone(), cache.clone(), notifier, broadcaster)
            .with_cache_timeout(config.cache_timeout),
        availability: AvailabilityEngine::new(store, cache, config),
    })
}

/// Connects the Redis slot cache, giving up after `timeout`.
///
/// The cache is not authoritative, so an unreachable or unresponsive Redis
/// yields `None` and the caller falls back to the in-memory cache.
pub async fn connect_slot_cache(url: &str, timeout: Duration) -> Option<RedisSlotCache> {
    match RedisSlotCache::connect(url, timeout).await {
        Ok(cache) => {
            tracing::info!("using Redis slot cache");
            Some(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis slot cache unavailable, using in-memory slot cache");
            None
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ScheduleBackend, C: CacheBackend>(
    state: Arc<AppState<S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{appointments, providers};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/appointments", post(appointments::book::<S, C>))
        .route("/appointments/{id}", get(appointments::get::<S, C>))
        .route(
            "/appointments/{id}/cancel",
            post(appointments::cancel::<S, C>).put(appointments::cancel::<S, C>),
        )
        .route(
            "/appointments/{id}/reschedule",
            post(appointments::reschedule::<S, C>).put(appointments::reschedule::<S, C>),
        )
        .route(
            "/providers/availability",
            put(providers::set_availability::<S, C>).post(providers::set_availability::<S, C>),
        )
        .route(
            "/providers/{id}/availability",
            get(providers::list_availability::<S, C>),
        )
        .route("/providers/{id}/slots", get(providers::slots::<S, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
