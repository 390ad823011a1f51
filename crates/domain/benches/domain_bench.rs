use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::{TimeRange, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use dispatch::{InMemoryBroadcaster, InMemoryNotificationRelay};
use domain::{
    AvailabilityEngine, BookAppointment, BookingEngine, SchedulingConfig, SetAvailability,
    generate_free_slots,
};
use schedule_store::InMemoryStore;
use slot_cache::InMemorySlotCache;

fn bench_generate_free_slots(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2030, 1, 7, 0, 0, 0).unwrap();
    let window = TimeRange::new(start, start + Duration::hours(24));
    // Every other hour booked.
    let booked: Vec<TimeRange> = (0..12)
        .map(|h| TimeRange::starting_at(start + Duration::hours(h * 2), Duration::hours(1)))
        .collect();

    c.bench_function("domain/generate_free_slots_full_day", |b| {
        b.iter(|| generate_free_slots(window, &booked, Duration::minutes(30)));
    });
}

fn bench_get_free_slots(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let provider = UserId::new();

    let uncached = AvailabilityEngine::new(
        store.clone(),
        InMemorySlotCache::new(),
        SchedulingConfig::default().with_cache_ttl(std::time::Duration::ZERO),
    );
    let cached = AvailabilityEngine::new(
        store.clone(),
        InMemorySlotCache::new(),
        SchedulingConfig::default(),
    );

    rt.block_on(async {
        cached
            .set_availability(SetAvailability::new(provider, 1, "08:00", "20:00"))
            .await
            .unwrap();

        let booking = BookingEngine::new(
            store.clone(),
            InMemorySlotCache::new(),
            Arc::new(InMemoryNotificationRelay::new()),
            Arc::new(InMemoryBroadcaster::new()),
        );
        for h in [9, 11, 13, 15] {
            let start = Utc.with_ymd_and_hms(2030, 1, 7, h, 0, 0).unwrap();
            booking
                .book(BookAppointment::new(
                    UserId::new(),
                    provider.to_string(),
                    "Bench",
                    start,
                    start + Duration::minutes(45),
                ))
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/get_free_slots_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                uncached.get_free_slots(provider, "2030-01-07").await.unwrap();
            });
        });
    });

    c.bench_function("domain/get_free_slots_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                cached.get_free_slots(provider, "2030-01-07").await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_generate_free_slots, bench_get_free_slots);
criterion_main!(benches);
