use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Keyed cache whose entries expire a fixed time after insertion.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: DashMap::new() }
    }

    /// Value for `key` if it was inserted less than `ttl` ago.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("protocols".to_string(), 3usize);
        assert_eq!(cache.get_fresh(&"protocols".to_string()), Some(3));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(1u8, "x");
        assert_eq!(cache.get_fresh(&1), None);
    }

    #[test]
    fn clear_drops_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1u8, 1u8);
        cache.insert(2u8, 2u8);
        assert_eq!(cache.get_fresh(&2), Some(2));
        cache.clear();
        assert_eq!(cache.get_fresh(&1), None);
        assert_eq!(cache.get_fresh(&2), None);
    }
}
