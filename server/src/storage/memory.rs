//! In-process store backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::storage::{KeyValueStore, Keyspace, StoreError};

/// A [`KeyValueStore`] that keeps everything in memory.
///
/// Each primitive takes the lock once, so every call is atomic. Nothing
/// survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Keyspace>, StoreError> {
        self.keyspace.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.lock()?.increment(key)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.get(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.exists(key))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.delete(key))
    }

    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        self.lock()?.set_fields(key, fields)
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.get_field(key, field)
    }

    fn get_all_fields(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.lock()?.get_all_fields(key)
    }

    fn add_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.lock()?.add_member(key, member)
    }

    fn remove_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.lock()?.remove_member(key, member)
    }

    fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.lock()?.members(key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_concurrent_increments_are_unique() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| store.increment("counter").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate counter value {value}");
            }
        }
        assert_eq!(seen.len(), 2000);
        assert_eq!(store.get("counter").unwrap(), Some("2000".to_string()));
    }

    #[test]
    fn test_hash_round_trip() {
        let store = MemoryStore::new();
        store
            .set_fields("review:1", &[("rating", "5".to_string())])
            .unwrap();
        assert!(store.exists("review:1").unwrap());
        assert_eq!(
            store.get_field("review:1", "rating").unwrap(),
            Some("5".to_string())
        );
        assert!(store.delete("review:1").unwrap());
        assert!(!store.delete("review:1").unwrap());
        assert!(store.get_all_fields("review:1").unwrap().is_empty());
    }
}
