//! Per-collection query cache.
//!
//! Maps a query's canonical key to its sorted, unpaginated result. Entries
//! are never invalidated by collection mutation; only [`QueryCache::clear`]
//! drops them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Cached result sets keyed by canonical query string.
pub struct QueryCache<R> {
    entries: HashMap<String, Vec<Arc<R>>>,
}

impl<R> QueryCache<R> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        QueryCache {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached result for a key.
    pub fn get(&self, key: &str) -> Option<&[Arc<R>]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Stores a result, replacing any earlier one for the key.
    pub fn insert(&mut self, key: String, records: Vec<Arc<R>>) {
        self.entries.insert(key, records);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R> Default for QueryCache<R> {
    fn default() -> Self {
        QueryCache::new()
    }
}

impl<R> fmt::Debug for QueryCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}
