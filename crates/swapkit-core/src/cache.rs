//! Time-boxed in-memory cache for the latest price snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::PriceRecord;

/// Immutable, cheaply shared price payload.
pub type PriceSnapshot = Arc<[PriceRecord]>;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: PriceSnapshot,
    fetched_at: Instant,
}

impl CacheEntry {
    fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }
}

/// Single-slot cache holding the last fetched price payload.
///
/// An entry older than the TTL reads as absent. Stored payloads are shared
/// as `Arc<[PriceRecord]>`, so nothing handed out can mutate the cached copy.
#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cache with a TTL of 60 seconds.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(60))
    }

    /// Cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl == Duration::ZERO
    }

    /// The cached payload if present and not older than the TTL.
    pub fn get(&self) -> Option<PriceSnapshot> {
        let entry = self.entry.lock().expect("price cache lock is not poisoned");
        match entry.as_ref() {
            Some(entry) if entry.age() <= self.ttl => Some(Arc::clone(&entry.payload)),
            Some(entry) => {
                trace!(age_ms = entry.age().as_millis() as u64, "price cache expired");
                None
            }
            None => None,
        }
    }

    /// Store `payload` stamped with the current time and return the stored handle.
    ///
    /// A disabled cache returns the handle without storing it.
    pub fn set(&self, payload: impl Into<PriceSnapshot>) -> PriceSnapshot {
        let payload = payload.into();
        if self.is_disabled() {
            return payload;
        }

        let mut entry = self.entry.lock().expect("price cache lock is not poisoned");
        *entry = Some(CacheEntry {
            payload: Arc::clone(&payload),
            fetched_at: Instant::now(),
        });
        trace!(records = payload.len(), "price cache stored");
        payload
    }

    pub fn clear(&self) {
        let mut entry = self.entry.lock().expect("price cache lock is not poisoned");
        *entry = None;
    }

    /// Age of the held entry, expired or not.
    pub fn age(&self) -> Option<Duration> {
        let entry = self.entry.lock().expect("price cache lock is not poisoned");
        entry.as_ref().map(CacheEntry::age)
    }

    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtcDateTime;

    fn payload() -> Vec<PriceRecord> {
        let date = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp");
        vec![
            PriceRecord::new("ETH", Some(2000.0), date),
            PriceRecord::new("USDC", Some(1.0), date),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn returns_payload_within_ttl() {
        let cache = PriceCache::new(Duration::from_millis(100));
        assert!(cache.get().is_none());

        cache.set(payload());
        tokio::time::advance(Duration::from_millis(50)).await;

        let cached = cache.get().expect("fresh entry");
        assert_eq!(&cached[..], &payload()[..]);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_ttl() {
        let cache = PriceCache::new(Duration::from_millis(100));
        cache.set(payload());

        tokio::time::advance(Duration::from_millis(101)).await;

        assert!(cache.get().is_none());
        assert!(!cache.is_fresh());
        assert_eq!(cache.age(), Some(Duration::from_millis(101)));
    }

    #[tokio::test(start_paused = true)]
    async fn set_resets_the_clock() {
        let cache = PriceCache::new(Duration::from_millis(100));
        cache.set(payload());
        tokio::time::advance(Duration::from_millis(80)).await;
        cache.set(payload());
        tokio::time::advance(Duration::from_millis(80)).await;

        assert!(cache.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_entry() {
        let cache = PriceCache::with_default_ttl();
        cache.set(payload());
        cache.clear();

        assert!(cache.get().is_none());
        assert_eq!(cache.age(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_cache_never_stores() {
        let cache = PriceCache::disabled();
        let stored = cache.set(payload());

        assert_eq!(stored.len(), 2);
        assert!(cache.is_disabled());
        assert!(cache.get().is_none());
    }
}
