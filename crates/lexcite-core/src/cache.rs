use std::collections::HashMap;

use tracing::debug;

use crate::types::{ResolvedContent, SourceKey};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub source_key: SourceKey,
    pub resolved: ResolvedContent,
}

/// Resolved content for the sources visited during one panel session.
///
/// One slot per key. No expiry: the session clears it when the panel closes.
#[derive(Debug, Default)]
pub struct SourceContentCache {
    entries: HashMap<SourceKey, CacheEntry>,
}

impl SourceContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SourceKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store `resolved` under `key`, replacing any earlier entry for the same key.
    pub fn set(&mut self, key: SourceKey, resolved: ResolvedContent) {
        debug!(key = %key, origin = ?resolved.origin, "caching resolved source");
        let entry = CacheEntry {
            source_key: key.clone(),
            resolved,
        };
        self.entries.insert(key, entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
