//! Short-lived cache of free-slot lists keyed by provider and date.
//!
//! The cache is never authoritative. Callers treat every [`CacheError`] as a
//! miss and fall back to the schedule store.

pub mod cache;
pub mod codec;
pub mod error;
pub mod memory;
pub mod redis_cache;

pub use cache::{SlotCache, slot_key, with_timeout};
pub use codec::{decode_slots, encode_slots};
pub use error::{CacheError, Result};
pub use memory::InMemorySlotCache;
pub use redis_cache::RedisSlotCache;
