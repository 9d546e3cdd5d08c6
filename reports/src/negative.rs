// Lightweight negative cache which temporarily stores account ids with no
// usable credential in order to prevent repeated store lookups for requests
// that will be rejected anyway.
use crate::metrics_defs::{NEGATIVE_CACHE_HIT, NEGATIVE_CACHE_MISS};
use moka::sync::Cache;
use shared::counter;
use std::time::Duration;

const SIZE: u64 = 1000;
const TTL_SECS: u64 = 60;

pub struct NegativeCache {
    cache: Cache<i64, ()>,
}

impl NegativeCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(SIZE)
            .time_to_live(Duration::from_secs(TTL_SECS))
            .build();

        NegativeCache { cache }
    }

    pub fn mark_unauthorized(&self, account_id: i64) {
        self.cache.insert(account_id, ());
    }

    pub fn is_unauthorized(&self, account_id: i64) -> bool {
        let cache_hit = self.cache.contains_key(&account_id);
        let metric_def = if cache_hit {
            NEGATIVE_CACHE_HIT
        } else {
            NEGATIVE_CACHE_MISS
        };
        counter!(metric_def).increment(1);
        cache_hit
    }
}

impl Default for NegativeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_unauthorized_accounts() {
        let cache = NegativeCache::new();
        assert!(!cache.is_unauthorized(42));
        cache.mark_unauthorized(42);
        assert!(cache.is_unauthorized(42));
        assert!(!cache.is_unauthorized(7));
    }
}
