//! TTL cache — a bounded-lifetime map in front of the durable peer table.
//!
//! Entries carry their own expiry instant. Reads consult the expiry, so an
//! expired-but-not-yet-swept entry is already absent to callers; a detached
//! sweeper thread reclaims memory periodically and stops on its own once the
//! cache is dropped (it only holds a [`Weak`] handle).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Shared<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V> Shared<K, V> {
    fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let swept = before - entries.len();
        if swept > 0 {
            log::debug!("[cache] sweep removed {swept} expired entries");
        }
    }
}

/// A time-to-live keyed cache safe for concurrent use.
pub struct TtlCache<K, V> {
    shared: Arc<Shared<K, V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create a cache whose entries live for `ttl`, swept every
    /// `sweep_interval`.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let shared = Arc::new(Shared { entries: Mutex::new(HashMap::new()) });
        let weak: Weak<Shared<K, V>> = Arc::downgrade(&shared);
        std::thread::Builder::new()
            .name("ttl-cache-sweep".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(sweep_interval);
                    match weak.upgrade() {
                        Some(shared) => shared.sweep(),
                        None => break,
                    }
                }
            })
            .expect("failed to spawn cache sweeper");
        Self { shared, ttl }
    }

    /// Insert or replace, stamping a fresh expiry.
    pub fn insert(&self, key: K, value: V) {
        let entry = Entry { value, expires_at: Instant::now() + self.ttl };
        self.shared.entries.lock().unwrap().insert(key, entry);
    }

    /// Fetch a live entry. An expired entry is removed and reported as
    /// absent, forcing the caller back to the durable table.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.shared.entries.lock().unwrap();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Some(e.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Drop an entry regardless of its expiry.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shared.entries.lock().unwrap().remove(key).map(|e| e.value)
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.shared.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let cache = TtlCache::new(Duration::from_secs(60), Duration::from_secs(3600));
        cache.insert(7i64, "seven");
        assert_eq!(cache.get(&7), Some("seven"));
        assert_eq!(cache.get(&8), None);
    }

    #[test]
    fn read_consults_expiry() {
        let cache = TtlCache::new(Duration::from_millis(10), Duration::from_secs(3600));
        cache.insert(1i64, "stale");
        std::thread::sleep(Duration::from_millis(30));
        // Sweep has not run, but the read must still treat the entry as gone.
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn sweep_reclaims_expired_entries() {
        let cache = TtlCache::new(Duration::from_millis(5), Duration::from_millis(20));
        cache.insert(1i64, "a");
        cache.insert(2i64, "b");
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn reinsert_refreshes_expiry() {
        let cache = TtlCache::new(Duration::from_millis(50), Duration::from_secs(3600));
        cache.insert(1i64, "old");
        std::thread::sleep(Duration::from_millis(30));
        cache.insert(1i64, "new");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&1), Some("new"));
    }
}
