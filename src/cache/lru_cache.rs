use dashmap::DashMap;
use std::{
    hash::Hash,
    time::{Duration, Instant},
};
use tracing::debug;

/// Cache entry con TTL
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_access: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_access: now,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Cache acotado por capacidad y TTL.
///
/// Al llenarse se expulsa la entrada con el acceso más antiguo. Las
/// entradas expiradas se descartan al leerlas o en `cleanup_expired`.
#[derive(Debug)]
pub struct LRUCache<K: Clone + Eq + Hash, V> {
    data: DashMap<K, CacheEntry<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> LRUCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        if !self.data.contains_key(&key) && self.data.len() >= self.capacity {
            self.evict_oldest();
        }
        self.data.insert(key, CacheEntry::new(value)).map(|old| old.value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entry = self.data.get_mut(key)?;
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.data.remove(key);
            return None;
        }
        entry.last_access = Instant::now();
        Some(entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Limpia entradas expiradas y retorna el número de elementos removidos
    pub fn cleanup_expired(&self) -> usize {
        let before = self.data.len();
        let ttl = self.ttl;
        self.data.retain(|_, entry| !entry.is_expired(ttl));
        let removed = before.saturating_sub(self.data.len());

        if removed > 0 {
            debug!("Limpiadas {} entradas expiradas del cache", removed);
        }

        removed
    }

    fn evict_oldest(&self) {
        let oldest = self
            .data
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.data.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache: LRUCache<String, u32> = LRUCache::new(2, Duration::from_secs(60));
        cache.insert("a".into(), 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".into(), 2);
        std::thread::sleep(Duration::from_millis(2));

        // "a" pasa a ser el más reciente
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(2));

        cache.insert("c".into(), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache: LRUCache<&'static str, u32> = LRUCache::new(1, Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.insert("a", 2), Some(1));
        assert_eq!(cache.get(&"a"), Some(2));
    }

    #[test]
    fn test_expired_entries() {
        let cache: LRUCache<&'static str, u32> = LRUCache::new(10, Duration::from_millis(5));
        cache.insert("a", 1);
        cache.insert("b", 2);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 0);
    }
}
