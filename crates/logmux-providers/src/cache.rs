//! Owned, explicitly-scoped caches with TTL freshness.

use logmux_types::now_ms;

/// Single-slot cache for an expensive-to-enumerate list. Callers pass
/// `refresh = true` to force a rebuild (e.g. when a search cursor restarts
/// at zero).
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl_ms: i64,
    slot: Option<(i64, Vec<T>)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_ms: i64) -> Self {
        TtlCache { ttl_ms, slot: None }
    }

    pub fn get(&self, refresh: bool) -> Option<Vec<T>> {
        if refresh {
            return None;
        }
        let (at, values) = self.slot.as_ref()?;
        if now_ms() - at > self.ttl_ms {
            return None;
        }
        Some(values.clone())
    }

    pub fn put(&mut self, values: Vec<T>) {
        self.slot = Some((now_ms(), values));
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_value_is_served() {
        let mut cache = TtlCache::new(60_000);
        assert!(cache.get(false).is_none());
        cache.put(vec![1, 2, 3]);
        assert_eq!(cache.get(false), Some(vec![1, 2, 3]));
    }

    #[test]
    fn refresh_bypasses_cache() {
        let mut cache = TtlCache::new(60_000);
        cache.put(vec![1]);
        assert!(cache.get(true).is_none());
    }

    #[test]
    fn expired_value_is_dropped() {
        let mut cache = TtlCache::new(-1);
        cache.put(vec![1]);
        assert!(cache.get(false).is_none());
    }
}
