use cached::{Cached, SizedCache};

use crate::dictionary::Pattern;

/// Bounded pattern-keyed memo, least recently used entries evicted first.
pub struct PatternCache<V> {
    store: SizedCache<Pattern, V>,
}

impl<V> PatternCache<V> {
    pub fn with_size(size: usize) -> PatternCache<V> {
        PatternCache {
            store: SizedCache::with_size(size.max(1)),
        }
    }

    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, pattern: &Pattern, f: F) -> &V {
        self.store.cache_get_or_set_with(pattern.clone(), f)
    }

    pub fn len(&self) -> usize {
        self.store.cache_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.store.cache_clear();
    }
}
