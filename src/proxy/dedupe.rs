//! Demo request de-duplication
//!
//! A TTL cache keyed on the request payload (or an explicit idempotency
//! header). Repeated submissions inside the window are rejected before they
//! reach the upstream, so a double-clicked demo form costs one cold start
//! instead of two.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// TTL cache of recently seen demo requests
pub struct RequestCache {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl RequestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cache key for a request: the caller-supplied idempotency key when
    /// present, otherwise a digest of the raw body bytes.
    pub fn key_for(body: &[u8], idempotency_key: Option<&str>) -> String {
        match idempotency_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => hex::encode(Sha256::digest(body)),
        }
    }

    /// Record a key if it is not already present and fresh.
    ///
    /// Returns true when the caller holds the key (proceed), false when a
    /// fresh entry already exists (duplicate).
    pub fn check_and_insert(&self, key: &str) -> bool {
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if now.duration_since(*occupied.get()) < self.ttl {
                    debug!(key, "Duplicate demo request within dedupe window");
                    false
                } else {
                    occupied.insert(now);
                    true
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
        }
    }

    /// Drop a key before its TTL elapses, making an identical request
    /// admissible again. Used when the guarded work fails, so the client's
    /// retry is not mistaken for a duplicate.
    pub fn release(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop entries older than the TTL
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, seen_at| now.duration_since(*seen_at) < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawn a background task that periodically expires stale dedupe entries
pub fn spawn_dedupe_cleanup_task(cache: Arc<RequestCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cache.ttl.max(Duration::from_secs(5)));
        interval.tick().await;
        loop {
            interval.tick().await;
            let before = cache.len();
            cache.cleanup();
            let after = cache.len();
            if before != after {
                debug!(expired = before - after, "Expired dedupe cache entries");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_passes_duplicate_rejected() {
        let cache = RequestCache::new(Duration::from_secs(30));
        let key = RequestCache::key_for(br#"{"demo":"clinic"}"#, None);

        assert!(cache.check_and_insert(&key));
        assert!(!cache.check_and_insert(&key));
    }

    #[test]
    fn test_distinct_bodies_get_distinct_keys() {
        let a = RequestCache::key_for(br#"{"demo":"clinic"}"#, None);
        let b = RequestCache::key_for(br#"{"demo":"salon"}"#, None);
        assert_ne!(a, b);

        let cache = RequestCache::new(Duration::from_secs(30));
        assert!(cache.check_and_insert(&a));
        assert!(cache.check_and_insert(&b));
    }

    #[test]
    fn test_idempotency_key_overrides_body_digest() {
        let a = RequestCache::key_for(br#"{"demo":"clinic"}"#, Some("req-123"));
        let b = RequestCache::key_for(br#"{"demo":"salon"}"#, Some("req-123"));
        assert_eq!(a, b);
        assert_eq!(a, "req-123");
    }

    #[test]
    fn test_blank_idempotency_key_falls_back_to_digest() {
        let body = br#"{"demo":"clinic"}"#;
        let blank = RequestCache::key_for(body, Some("   "));
        let none = RequestCache::key_for(body, None);
        assert_eq!(blank, none);
    }

    #[test]
    fn test_stale_entry_is_reusable() {
        let cache = RequestCache::new(Duration::ZERO);
        let key = "req-456";

        assert!(cache.check_and_insert(key));
        // TTL of zero means the entry is immediately stale
        assert!(cache.check_and_insert(key));
    }

    #[test]
    fn test_released_key_is_reusable_before_ttl() {
        let cache = RequestCache::new(Duration::from_secs(30));
        let key = RequestCache::key_for(br#"{"demo":"clinic"}"#, None);

        assert!(cache.check_and_insert(&key));
        assert!(!cache.check_and_insert(&key));

        cache.release(&key);
        assert!(cache.check_and_insert(&key));
    }

    #[test]
    fn test_cleanup_drops_stale_entries() {
        let cache = RequestCache::new(Duration::ZERO);
        cache.check_and_insert("a");
        cache.check_and_insert("b");
        assert_eq!(cache.len(), 2);

        cache.cleanup();
        assert!(cache.is_empty());
    }
}
