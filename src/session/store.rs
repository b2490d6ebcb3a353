//! Generic session store keyed by opaque string ids.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry<T> {
    value: T,
    last_activity: DateTime<Utc>,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            last_activity: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.last_activity).to_std() {
            Ok(idle) => idle > ttl,
            // Negative duration means clock skew; keep the entry.
            Err(_) => false,
        }
    }
}

/// Thread-safe store of sessions.
///
/// Cloning the store is cheap and every clone shares the same entries. Reads
/// and updates count as activity and push the entry's expiry forward.
#[derive(Debug)]
pub struct SessionStore<T> {
    inner: Arc<RwLock<HashMap<String, Entry<T>>>>,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SessionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SessionStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a session, replacing any previous entry with the same id.
    pub fn insert(&self, id: impl Into<String>, value: T) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(id.into(), Entry::new(value));
    }

    /// Run `f` against the session with the given id.
    ///
    /// Returns `None` when the id is unknown.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = guard.get_mut(id)?;
        entry.touch();
        Some(f(&mut entry.value))
    }

    /// Remove a session by id.
    pub fn remove(&self, id: &str) -> Option<T> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(id).map(|entry| entry.value)
    }

    /// Check whether a session exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Get the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every session idle for longer than `ttl`.
    ///
    /// The removed values are returned so callers can release whatever the
    /// sessions own (timers, channels).
    pub fn remove_expired(&self, ttl: Duration) -> Vec<T> {
        let now = Utc::now();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, ttl))
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| guard.remove(&id))
            .map(|entry| entry.value)
            .collect()
    }
}

impl<T: Clone> SessionStore<T> {
    /// Get a copy of a session by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<T> {
        self.update(id, |value| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        store.insert("a", "first".to_string());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").as_deref(), Some("first"));
        assert!(store.get("missing").is_none());

        assert_eq!(store.remove("a").as_deref(), Some("first"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_mutates_in_place() {
        let store = SessionStore::new();
        store.insert("counter", 0_u32);

        for _ in 0..3 {
            store.update("counter", |n| *n += 1);
        }

        assert_eq!(store.get("counter"), Some(3));
        assert_eq!(store.update("missing", |n| *n), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = SessionStore::new();
        let other = store.clone();
        store.insert("shared", 7_u8);
        assert!(other.contains("shared"));
    }

    #[test]
    fn test_remove_expired() {
        let store = SessionStore::new();
        store.insert("old", 1_u8);
        std::thread::sleep(Duration::from_millis(200));
        store.insert("fresh", 2_u8);

        let removed = store.remove_expired(Duration::from_millis(100));
        assert_eq!(removed, vec![1]);
        assert!(store.contains("fresh"));
        assert!(!store.contains("old"));

        assert!(store.remove_expired(DEFAULT_SESSION_TTL).is_empty());
    }
}
