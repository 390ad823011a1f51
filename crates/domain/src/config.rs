use std::time::Duration as StdDuration;

use chrono::Duration;

/// Tunables shared by both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Length of one bookable slot.
    pub slot_duration: Duration,
    /// How long a computed slot list stays in the cache.
    pub cache_ttl: StdDuration,
    /// Longest wait for any single cache call before it counts as a miss.
    pub cache_timeout: StdDuration,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_duration: Duration::minutes(30),
            cache_ttl: StdDuration::from_secs(60),
            cache_timeout: StdDuration::from_millis(250),
        }
    }
}

impl SchedulingConfig {
    pub fn with_cache_ttl(mut self, ttl: StdDuration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: StdDuration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn with_slot_duration(mut self, slot_duration: Duration) -> Self {
        self.slot_duration = slot_duration;
        self
    }
}
