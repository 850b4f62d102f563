// Optional read-endpoint response cache (§4.K). Keyed by
// `(endpoint, query, auth-principal)`, content-addressed on the serialized
// response bytes, with an ETag derived from the cache `till` at write time.
// A write to G/H invalidates the whole thing — precise per-key
// invalidation would need to know which keys a given split/segment touches,
// which isn't tracked, so a coarse full-clear keeps the invariant simple
// and correct at the cost of cache-hit rate right after a sync tick.

use dashmap::DashMap;

use crate::endpoint::EndpointId;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    endpoint: EndpointId,
    query: String,
    principal: String,
}

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub etag: String,
    pub body: Vec<u8>,
}

pub struct ResponseCache {
    entries: DashMap<CacheKey, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, endpoint: EndpointId, query: &str, principal: &str) -> Option<CachedResponse> {
        let key = CacheKey { endpoint, query: query.to_string(), principal: principal.to_string() };
        self.entries.get(&key).map(|e| e.clone())
    }

    pub fn put(&self, endpoint: EndpointId, query: &str, principal: &str, etag: String, body: Vec<u8>) {
        let key = CacheKey { endpoint, query: query.to_string(), principal: principal.to_string() };
        self.entries.insert(key, CachedResponse { etag, body });
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResponseCache::new();
        cache.put(EndpointId::SplitChanges, "since=0", "key-1", "2".to_string(), b"body".to_vec());
        let hit = cache.get(EndpointId::SplitChanges, "since=0", "key-1").unwrap();
        assert_eq!(hit.etag, "2");
        assert_eq!(hit.body, b"body");
    }

    #[test]
    fn invalidate_all_clears_every_entry() {
        let cache = ResponseCache::new();
        cache.put(EndpointId::SplitChanges, "since=0", "key-1", "2".to_string(), b"body".to_vec());
        cache.invalidate_all();
        assert!(cache.get(EndpointId::SplitChanges, "since=0", "key-1").is_none());
    }
}
