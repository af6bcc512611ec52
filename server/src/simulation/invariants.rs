//! Invariant checking for the review index.
//!
//! The model tracks which reviews should exist after each operation. The
//! checker compares it against both the public read paths and the raw index
//! sets, since the read paths hide stale index entries.

use std::collections::{BTreeMap, BTreeSet};

use crate::reviews::keys::{course_index_key, user_index_key};
use crate::reviews::{Review, ReviewId, ReviewIndexStore};
use crate::storage::KeyValueStore;

/// Expected state of the review index.
#[derive(Debug, Default)]
pub struct ReviewModel {
    /// Live reviews by id.
    reviews: BTreeMap<ReviewId, Review>,
    /// Every course and user ever used, so emptied indexes are checked too.
    courses: BTreeSet<String>,
    users: BTreeSet<String>,
    /// Highest id ever issued.
    last_id: u64,
}

impl ReviewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_create(&mut self, review: &Review) {
        self.last_id = self.last_id.max(review.id.0);
        self.courses.insert(review.course_id.clone());
        self.users.insert(review.user_id.clone());
        self.reviews.insert(review.id, review.clone());
    }

    pub fn record_update(&mut self, id: ReviewId, rating: i64, comment: &str) {
        if let Some(review) = self.reviews.get_mut(&id) {
            review.rating = rating;
            comment.clone_into(&mut review.comment);
        }
    }

    pub fn record_delete(&mut self, id: ReviewId) {
        self.reviews.remove(&id);
    }

    pub fn contains(&self, id: ReviewId) -> bool {
        self.reviews.contains_key(&id)
    }

    pub const fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn live_ids(&self) -> Vec<ReviewId> {
        self.reviews.keys().copied().collect()
    }

    fn expected_for(&self, matches: impl Fn(&Review) -> bool) -> Vec<Review> {
        self.reviews
            .values()
            .filter(|review| matches(review))
            .cloned()
            .collect()
    }
}

/// A detected difference between the model and the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A read path returned something other than the expected reviews.
    ReadMismatch {
        operation: String,
        expected: Vec<ReviewId>,
        actual: Vec<ReviewId>,
    },
    /// A raw index set holds an id with no live review.
    OrphanIndexEntry { index: String, member: String },
    /// A live review is missing from its index set.
    MissingIndexEntry { index: String, id: ReviewId },
    /// A read path returned a review whose fields differ from the model.
    FieldMismatch { id: ReviewId },
    /// A read failed outright.
    ReadFailed { operation: String, error: String },
}

/// Compares a review store against a [`ReviewModel`].
pub struct InvariantChecker<'a> {
    reviews: &'a ReviewIndexStore,
    store: &'a dyn KeyValueStore,
}

impl<'a> InvariantChecker<'a> {
    pub fn new(reviews: &'a ReviewIndexStore, store: &'a dyn KeyValueStore) -> Self {
        Self { reviews, store }
    }

    /// Run every check and collect the violations.
    pub fn check(&self, model: &ReviewModel) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        self.check_read(
            "list_all".to_string(),
            self.reviews.list_all().map_err(|e| e.to_string()),
            &model.expected_for(|_| true),
            &mut violations,
        );

        for course in &model.courses {
            self.check_read(
                format!("get_by_course({course})"),
                self.reviews.get_by_course(course).map_err(|e| e.to_string()),
                &model.expected_for(|review| &review.course_id == course),
                &mut violations,
            );
            self.check_index(
                &course_index_key(course),
                model,
                |review| &review.course_id == course,
                &mut violations,
            );
        }

        for user in &model.users {
            self.check_read(
                format!("get_by_user({user})"),
                self.reviews.get_by_user(user).map_err(|e| e.to_string()),
                &model.expected_for(|review| &review.user_id == user),
                &mut violations,
            );
            self.check_index(
                &user_index_key(user),
                model,
                |review| &review.user_id == user,
                &mut violations,
            );
        }

        violations
    }

    fn check_read(
        &self,
        operation: String,
        actual: Result<Vec<Review>, String>,
        expected: &[Review],
        violations: &mut Vec<InvariantViolation>,
    ) {
        let actual = match actual {
            Ok(actual) => actual,
            Err(error) => {
                violations.push(InvariantViolation::ReadFailed { operation, error });
                return;
            }
        };

        let actual_ids: Vec<ReviewId> = actual.iter().map(|review| review.id).collect();
        let expected_ids: Vec<ReviewId> = expected.iter().map(|review| review.id).collect();
        if actual_ids != expected_ids {
            violations.push(InvariantViolation::ReadMismatch {
                operation,
                expected: expected_ids,
                actual: actual_ids,
            });
            return;
        }

        for (actual, expected) in actual.iter().zip(expected) {
            if actual != expected {
                violations.push(InvariantViolation::FieldMismatch { id: actual.id });
            }
        }
    }

    fn check_index(
        &self,
        index: &str,
        model: &ReviewModel,
        belongs: impl Fn(&Review) -> bool,
        violations: &mut Vec<InvariantViolation>,
    ) {
        let members: BTreeSet<String> = match self.store.members(index) {
            Ok(members) => members.into_iter().collect(),
            Err(e) => {
                violations.push(InvariantViolation::ReadFailed {
                    operation: format!("members({index})"),
                    error: e.to_string(),
                });
                return;
            }
        };

        for member in &members {
            let live = member
                .parse::<ReviewId>()
                .ok()
                .and_then(|id| model.reviews.get(&id))
                .is_some_and(&belongs);
            if !live {
                violations.push(InvariantViolation::OrphanIndexEntry {
                    index: index.to_string(),
                    member: member.clone(),
                });
            }
        }

        for review in model.reviews.values().filter(|review| belongs(review)) {
            if !members.contains(&review.id.to_string()) {
                violations.push(InvariantViolation::MissingIndexEntry {
                    index: index.to_string(),
                    id: review.id,
                });
            }
        }
    }
}
