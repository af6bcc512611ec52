//! Shared test fixtures: a pinned clock, a store that fails on demand, and
//! shortcuts for building review stores.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::reviews::{NewReview, ReviewIndexStore};
use crate::storage::{KeyValueStore, MemoryStore, StoreError, TimeSource};

/// A clock stopped at 2026-10-19 12:00:00 UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl Default for FixedTimeSource {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap())
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Build a review store on `store` with the fixed clock.
pub fn review_store_on(store: Arc<dyn KeyValueStore>) -> ReviewIndexStore {
    ReviewIndexStore::new(store, Arc::new(FixedTimeSource::default()))
}

/// Build a review store on a fresh in-memory store with the fixed clock.
pub fn new_review_store() -> ReviewIndexStore {
    review_store_on(Arc::new(MemoryStore::new()))
}

pub fn new_review(course_id: &str, user_id: &str, rating: i64, comment: &str) -> NewReview {
    NewReview {
        course_id: course_id.to_string(),
        user_id: user_id.to_string(),
        rating,
        comment: comment.to_string(),
    }
}

/// A [`MemoryStore`] that fails every command on keys with a chosen prefix.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_prefix: Mutex<Option<String>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent command whose key starts with `prefix`.
    pub fn fail_keys_with_prefix(&self, prefix: &str) {
        *self.failing_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn clear_faults(&self) {
        *self.failing_prefix.lock().unwrap() = None;
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        match self.failing_prefix.lock().unwrap().as_deref() {
            Some(prefix) if key.starts_with(prefix) => Err(StoreError::Io(std::io::Error::other(
                format!("injected fault on '{key}'"),
            ))),
            _ => Ok(()),
        }
    }
}

impl KeyValueStore for FaultyStore {
    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.increment(key)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(key)?;
        self.inner.get(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.check(key)?;
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check(key)?;
        self.inner.delete(key)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.set_fields(key, fields)
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.check(key)?;
        self.inner.get_field(key, field)
    }

    fn get_all_fields(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.check(key)?;
        self.inner.get_all_fields(key)
    }

    fn add_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check(key)?;
        self.inner.add_member(key, member)
    }

    fn remove_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check(key)?;
        self.inner.remove_member(key, member)
    }

    fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.check(key)?;
        self.inner.members(key)
    }
}
