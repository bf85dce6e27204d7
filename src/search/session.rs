//! Session-scoped suggestion cache
//!
//! Holds the suggestions from recent `suggest` calls so a selection can be
//! resolved without a second provider round trip. Entries expire after a
//! bounded TTL; this is not a durable cache.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::search::client::Suggestion;

struct CachedSuggestion {
    suggestion: Suggestion,
    inserted_at: Instant,
}

/// TTL cache of suggestions keyed by suggestion identifier
pub struct SuggestionCache {
    entries: DashMap<String, CachedSuggestion>,
    ttl: Duration,
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cache a batch of suggestions, replacing earlier entries with the same
    /// id
    pub fn insert_all(&self, suggestions: &[Suggestion]) {
        let now = Instant::now();
        for suggestion in suggestions {
            self.entries.insert(
                suggestion.id.clone(),
                CachedSuggestion {
                    suggestion: suggestion.clone(),
                    inserted_at: now,
                },
            );
        }
    }

    /// Look up a cached suggestion; expired entries are dropped on access
    pub fn get(&self, id: &str) -> Option<Suggestion> {
        let expired = match self.entries.get(id) {
            Some(entry) => {
                if entry.inserted_at.elapsed() < self.ttl {
                    return Some(entry.suggestion.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(id);
        }
        None
    }

    /// Drop all expired entries
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::client::Location;

    fn suggestion(id: &str) -> Suggestion {
        Suggestion {
            id: id.to_string(),
            name: "Somewhere".to_string(),
            address: "1 Main St".to_string(),
            location: Location {
                latitude: 0.0,
                longitude: 0.0,
            },
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.insert_all(&[suggestion("a"), suggestion("b")]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().id, "a");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = SuggestionCache::new(Duration::from_millis(0));
        cache.insert_all(&[suggestion("a")]);

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
        // The expired entry was removed on access
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = SuggestionCache::new(Duration::from_millis(0));
        cache.insert_all(&[suggestion("a"), suggestion("b")]);

        std::thread::sleep(Duration::from_millis(5));
        cache.purge_expired();
        assert!(cache.is_empty());
    }
}
