//! The review index store.
//!
//! Maintains review records and their course/user secondary indexes on top of
//! a [`KeyValueStore`].
//!
//! # Write Order
//!
//! - create: counter, record, course index, user index
//! - update: existence check, then the `rating`/`comment` fields
//! - delete: read index keys, record, course index, user index
//!
//! Each step is one atomic store command. A failure part-way leaves the
//! earlier steps in place; there is no rollback. Read paths tolerate the
//! resulting drift: index entries whose record is gone are skipped, and hashes
//! missing required fields (partial records) are treated as absent.

use std::sync::Arc;

use crate::reviews::keys::{ID_COUNTER_KEY, course_index_key, record_key, user_index_key};
use crate::reviews::{RecordError, Review, ReviewError, ReviewId, field};
use crate::storage::{KeyValueStore, StoreError, TimeSource};

/// Input for [`ReviewIndexStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub course_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
}

/// Input for [`ReviewIndexStore::update`]. Only these fields are mutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub rating: i64,
    pub comment: String,
}

/// Reviews plus their course and user indexes.
pub struct ReviewIndexStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn TimeSource>,
}

impl ReviewIndexStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self { store, clock }
    }

    /// Create a review and add it to both indexes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `course_id` or `user_id` is empty, before any
    /// id is allocated. Store failures are returned as-is; writes that already
    /// happened are not undone.
    pub fn create(&self, new_review: NewReview) -> Result<Review, ReviewError> {
        if new_review.course_id.is_empty() {
            return Err(ReviewError::InvalidInput(
                "course_id must not be empty".to_string(),
            ));
        }
        if new_review.user_id.is_empty() {
            return Err(ReviewError::InvalidInput(
                "user_id must not be empty".to_string(),
            ));
        }

        let id = self.next_id()?;
        let review = Review {
            id,
            course_id: new_review.course_id,
            user_id: new_review.user_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: self.clock.now(),
        };

        let member = id.to_string();
        self.store.set_fields(&record_key(id), &review.to_fields())?;
        self.store
            .add_member(&course_index_key(&review.course_id), &member)?;
        self.store
            .add_member(&user_index_key(&review.user_id), &member)?;

        tracing::debug!(
            "created review {id} for course '{}' by user '{}'",
            review.course_id,
            review.user_id
        );
        Ok(review)
    }

    /// Fetch one review.
    pub fn get(&self, id: ReviewId) -> Result<Review, ReviewError> {
        self.load(id)?.ok_or(ReviewError::NotFound(id))
    }

    /// All reviews of a course, in ascending id order.
    ///
    /// An unknown course yields an empty list.
    pub fn get_by_course(&self, course_id: &str) -> Result<Vec<Review>, ReviewError> {
        self.load_indexed(&course_index_key(course_id))
    }

    /// All reviews written by a user, in ascending id order.
    ///
    /// An unknown user yields an empty list.
    pub fn get_by_user(&self, user_id: &str) -> Result<Vec<Review>, ReviewError> {
        self.load_indexed(&user_index_key(user_id))
    }

    /// Overwrite the rating and comment of an existing review.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists under `id`; nothing is written
    /// in that case.
    pub fn update(&self, id: ReviewId, update: ReviewUpdate) -> Result<(), ReviewError> {
        let key = record_key(id);
        if !self.store.exists(&key)? {
            return Err(ReviewError::NotFound(id));
        }

        // A concurrent delete can land between the check and this write.
        self.store.set_fields(
            &key,
            &[
                (field::RATING, update.rating.to_string()),
                (field::COMMENT, update.comment),
            ],
        )?;

        tracing::debug!("updated review {id}");
        Ok(())
    }

    /// Delete a review and its index entries.
    ///
    /// Deleting an id that does not exist is a no-op. Returns whether a
    /// record was removed.
    pub fn delete(&self, id: ReviewId) -> Result<bool, ReviewError> {
        let key = record_key(id);
        let course_id = self.store.get_field(&key, field::COURSE_ID)?;
        let user_id = self.store.get_field(&key, field::USER_ID)?;

        let existed = self.store.delete(&key)?;

        let member = id.to_string();
        if let Some(course_id) = course_id {
            self.store
                .remove_member(&course_index_key(&course_id), &member)?;
        }
        if let Some(user_id) = user_id {
            self.store
                .remove_member(&user_index_key(&user_id), &member)?;
        }

        if existed {
            tracing::debug!("deleted review {id}");
        }
        Ok(existed)
    }

    /// Every review, found by probing each id from 1 to the last issued id.
    ///
    /// Costs one existence check per id ever issued, deleted ones included.
    pub fn list_all(&self) -> Result<Vec<Review>, ReviewError> {
        let Some(counter) = self.store.get(ID_COUNTER_KEY)? else {
            return Ok(Vec::new());
        };
        let last_id = counter
            .parse::<u64>()
            .map_err(|_| counter_error())?;

        let mut reviews = Vec::new();
        for raw in 1..=last_id {
            let id = ReviewId(raw);
            if !self.store.exists(&record_key(id))? {
                continue;
            }
            if let Some(review) = self.load(id)? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }

    fn next_id(&self) -> Result<ReviewId, ReviewError> {
        let value = self.store.increment(ID_COUNTER_KEY)?;
        u64::try_from(value)
            .ok()
            .filter(|&id| id > 0)
            .map(ReviewId)
            .ok_or_else(|| counter_error().into())
    }

    /// Load a record, treating a missing or partial record as absent.
    fn load(&self, id: ReviewId) -> Result<Option<Review>, ReviewError> {
        let fields = self.store.get_all_fields(&record_key(id))?;
        if fields.is_empty() {
            return Ok(None);
        }

        match Review::from_fields(id, &fields) {
            Ok(review) => Ok(Some(review)),
            Err(RecordError::MissingField(name)) => {
                tracing::warn!("review {id} is a partial record (missing '{name}'), skipping");
                Ok(None)
            }
            Err(source) => Err(ReviewError::CorruptRecord { id, source }),
        }
    }

    fn load_indexed(&self, index_key: &str) -> Result<Vec<Review>, ReviewError> {
        let mut ids = Vec::new();
        for member in self.store.members(index_key)? {
            match member.parse::<ReviewId>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    tracing::warn!("index '{index_key}' holds non-numeric member '{member}'");
                }
            }
        }
        ids.sort_unstable();

        let mut reviews = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(id)? {
                Some(review) => reviews.push(review),
                None => tracing::warn!("index '{index_key}' references missing review {id}"),
            }
        }
        Ok(reviews)
    }
}

fn counter_error() -> StoreError {
    StoreError::NotAnInteger {
        key: ID_COUNTER_KEY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{FaultyStore, FixedTimeSource, new_review, review_store_on};

    fn setup() -> (Arc<MemoryStore>, ReviewIndexStore) {
        let store = Arc::new(MemoryStore::new());
        let reviews = review_store_on(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        (store, reviews)
    }

    fn ids(reviews: &[Review]) -> Vec<u64> {
        reviews.iter().map(|review| review.id.0).collect()
    }

    #[test]
    fn test_create_returns_full_record() {
        let (_, reviews) = setup();
        let review = reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();

        assert_eq!(review.id, ReviewId(1));
        assert_eq!(review.course_id, "CS101");
        assert_eq!(review.user_id, "alice");
        assert_eq!(review.rating, 5);
        assert_eq!(review.comment, "great");
        assert_eq!(review.created_at, FixedTimeSource::default().now());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let (_, reviews) = setup();
        let mut last = 0;
        for i in 0..20 {
            let review = reviews
                .create(new_review(&format!("C{}", i % 3), "bob", 3, ""))
                .unwrap();
            assert!(review.id.0 > last);
            last = review.id.0;
        }
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let (_, reviews) = setup();
        let first = reviews.create(new_review("CS101", "alice", 5, "a")).unwrap();
        assert!(reviews.delete(first.id).unwrap());
        let second = reviews.create(new_review("CS101", "alice", 4, "b")).unwrap();
        assert_eq!(second.id, ReviewId(2));
    }

    #[test]
    fn test_create_rejects_empty_keys_without_consuming_id() {
        let (store, reviews) = setup();
        assert!(matches!(
            reviews.create(new_review("", "alice", 5, "x")),
            Err(ReviewError::InvalidInput(_))
        ));
        assert!(matches!(
            reviews.create(new_review("CS101", "", 5, "x")),
            Err(ReviewError::InvalidInput(_))
        ));
        assert_eq!(store.get(ID_COUNTER_KEY).unwrap(), None);
    }

    #[test]
    fn test_indexes_contain_new_id_exactly_once() {
        let (_, reviews) = setup();
        let review = reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();
        reviews.create(new_review("CS102", "alice", 2, "meh")).unwrap();
        reviews.create(new_review("CS101", "bob", 4, "ok")).unwrap();

        let by_course = reviews.get_by_course("CS101").unwrap();
        assert_eq!(ids(&by_course), vec![1, 3]);
        assert_eq!(by_course[0], review);

        let by_user = reviews.get_by_user("alice").unwrap();
        assert_eq!(ids(&by_user), vec![1, 2]);
    }

    #[test]
    fn test_unknown_course_and_user_are_empty() {
        let (_, reviews) = setup();
        assert!(reviews.get_by_course("nope").unwrap().is_empty());
        assert!(reviews.get_by_user("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_stale_index_entries_are_skipped() {
        let (store, reviews) = setup();
        reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();
        store.add_member(&course_index_key("CS101"), "99").unwrap();
        store.add_member(&course_index_key("CS101"), "garbage").unwrap();

        let by_course = reviews.get_by_course("CS101").unwrap();
        assert_eq!(ids(&by_course), vec![1]);
    }

    #[test]
    fn test_update_changes_only_mutable_fields() {
        let (_, reviews) = setup();
        let original = reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();

        reviews
            .update(
                original.id,
                ReviewUpdate {
                    rating: 2,
                    comment: "changed my mind".to_string(),
                },
            )
            .unwrap();

        let updated = reviews.get(original.id).unwrap();
        assert_eq!(updated.rating, 2);
        assert_eq!(updated.comment, "changed my mind");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.course_id, original.course_id);
        assert_eq!(updated.user_id, original.user_id);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn test_update_missing_review_creates_nothing() {
        let (store, reviews) = setup();
        let result = reviews.update(
            ReviewId(5),
            ReviewUpdate {
                rating: 1,
                comment: "ghost".to_string(),
            },
        );
        assert!(matches!(result, Err(ReviewError::NotFound(ReviewId(5)))));
        assert!(!store.exists(&record_key(ReviewId(5))).unwrap());
    }

    #[test]
    fn test_delete_removes_index_entries() {
        let (store, reviews) = setup();
        let review = reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();

        assert!(reviews.delete(review.id).unwrap());
        assert!(reviews.get_by_course("CS101").unwrap().is_empty());
        assert!(reviews.get_by_user("alice").unwrap().is_empty());
        assert!(!store.exists(&course_index_key("CS101")).unwrap());
        assert!(matches!(
            reviews.get(review.id),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_, reviews) = setup();
        let review = reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();
        assert!(reviews.delete(review.id).unwrap());
        assert!(!reviews.delete(review.id).unwrap());
        assert!(!reviews.delete(ReviewId(1000)).unwrap());
    }

    #[test]
    fn test_list_all_without_counter_is_empty() {
        let (_, reviews) = setup();
        assert!(reviews.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_list_all_after_creates_and_delete() {
        let (_, reviews) = setup();
        for i in 0..5 {
            reviews
                .create(new_review("CS101", &format!("user{i}"), i, "x"))
                .unwrap();
        }
        assert_eq!(ids(&reviews.list_all().unwrap()), vec![1, 2, 3, 4, 5]);

        reviews.delete(ReviewId(3)).unwrap();
        let remaining = reviews.list_all().unwrap();
        assert_eq!(remaining.len(), 4);
        assert!(remaining.iter().all(|review| review.id != ReviewId(3)));

        // Deleting the highest id does not shrink the scan range.
        reviews.delete(ReviewId(5)).unwrap();
        let next = reviews.create(new_review("CS101", "late", 1, "x")).unwrap();
        assert_eq!(next.id, ReviewId(6));
        assert_eq!(ids(&reviews.list_all().unwrap()), vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_partial_record_is_invisible() {
        let (store, reviews) = setup();
        reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();

        // What an update racing a delete can leave behind.
        store
            .set_fields(
                &record_key(ReviewId(1)),
                &[(field::RATING, "1".to_string())],
            )
            .unwrap();
        store
            .set_fields(
                &record_key(ReviewId(2)),
                &[(field::RATING, "1".to_string())],
            )
            .unwrap();
        store.increment(ID_COUNTER_KEY).unwrap();

        assert_eq!(ids(&reviews.list_all().unwrap()), vec![1]);
        assert!(matches!(
            reviews.get(ReviewId(2)),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let (store, reviews) = setup();
        reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();
        store
            .set_fields(
                &record_key(ReviewId(1)),
                &[(field::RATING, "lots".to_string())],
            )
            .unwrap();

        assert!(matches!(
            reviews.get_by_course("CS101"),
            Err(ReviewError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_corrupt_counter_is_an_error() {
        let (store, reviews) = setup();
        store.add_member(ID_COUNTER_KEY, "x").unwrap();
        assert!(matches!(
            reviews.list_all(),
            Err(ReviewError::Store(StoreError::WrongType { .. }))
        ));
        assert!(matches!(
            reviews.create(new_review("CS101", "alice", 5, "x")),
            Err(ReviewError::Store(StoreError::WrongType { .. }))
        ));
    }

    #[test]
    fn test_store_errors_are_not_swallowed() {
        let store = Arc::new(FaultyStore::new());
        let reviews = review_store_on(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        reviews.create(new_review("CS101", "alice", 5, "great")).unwrap();

        store.fail_keys_with_prefix("course:");
        assert!(matches!(
            reviews.get_by_course("CS101"),
            Err(ReviewError::Store(StoreError::Io(_)))
        ));

        store.fail_keys_with_prefix("review:");
        assert!(matches!(
            reviews.list_all(),
            Err(ReviewError::Store(_))
        ));
    }

    #[test]
    fn test_interrupted_create_leaves_indexes_inconsistent() {
        let store = Arc::new(FaultyStore::new());
        let reviews = review_store_on(Arc::clone(&store) as Arc<dyn KeyValueStore>);

        store.fail_keys_with_prefix("user:");
        assert!(reviews.create(new_review("CS101", "alice", 5, "great")).is_err());
        store.clear_faults();

        // Record and course index were written; the user index was not.
        assert_eq!(ids(&reviews.get_by_course("CS101").unwrap()), vec![1]);
        assert!(reviews.get_by_user("alice").unwrap().is_empty());
        assert_eq!(ids(&reviews.list_all().unwrap()), vec![1]);
    }

    #[test]
    fn test_concurrent_creates_get_unique_ids() {
        let (_, reviews) = setup();
        let reviews = Arc::new(reviews);

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let reviews = Arc::clone(&reviews);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            reviews
                                .create(new_review(
                                    "CS101",
                                    &format!("user{worker}"),
                                    i,
                                    "concurrent",
                                ))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 200);
        assert_eq!(reviews.get_by_course("CS101").unwrap().len(), 200);
        assert_eq!(reviews.get_by_user("user0").unwrap().len(), 50);
    }
}
