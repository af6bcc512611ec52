//! Seeded random operation sequences against the review index.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::invariants::{InvariantChecker, InvariantViolation, ReviewModel};
use crate::reviews::{NewReview, ReviewError, ReviewId, ReviewIndexStore, ReviewUpdate};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::testing::review_store_on;

const COURSES: [&str; 4] = ["CS101", "CS102", "MATH200", "PHYS110"];
const USERS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Probability that an operation is a create.
    pub create_rate: f64,
    /// Probability that an update/delete targets an id that never existed.
    pub missing_id_rate: f64,
    /// Run the invariant checker every this many operations.
    pub check_interval: usize,
}

impl SimulatorConfig {
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            create_rate: 0.4,
            missing_id_rate: 0.1,
            check_interval: 10,
        }
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Default)]
pub struct SimulationResult {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub not_found: usize,
    pub invariant_violations: Vec<(usize, InvariantViolation)>,
}

pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    store: Arc<MemoryStore>,
    reviews: ReviewIndexStore,
    model: ReviewModel,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let reviews = review_store_on(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            store,
            reviews,
            model: ReviewModel::new(),
        }
    }

    /// Run `operations` random operations, checking invariants along the way
    /// and once more at the end.
    pub fn run(&mut self, operations: usize) -> SimulationResult {
        let mut result = SimulationResult::default();

        for step in 0..operations {
            self.step(&mut result);
            if (step + 1) % self.config.check_interval == 0 {
                self.check(step, &mut result);
            }
        }
        self.check(operations, &mut result);
        result
    }

    fn step(&mut self, result: &mut SimulationResult) {
        if self.rng.random_bool(self.config.create_rate) {
            self.create(result);
            return;
        }

        let id = self.pick_id();
        if self.rng.random_bool(0.5) {
            self.update(id, result);
        } else {
            self.delete(id, result);
        }
    }

    fn create(&mut self, result: &mut SimulationResult) {
        let course = COURSES[self.rng.random_range(0..COURSES.len())];
        let user = USERS[self.rng.random_range(0..USERS.len())];
        let rating = self.rng.random_range(1..=5);
        let review = self
            .reviews
            .create(NewReview {
                course_id: course.to_string(),
                user_id: user.to_string(),
                rating,
                comment: format!("review #{}", result.creates),
            })
            .unwrap();

        assert!(review.id.0 > self.model.last_id(), "ids must strictly increase");
        self.model.record_create(&review);
        result.creates += 1;
    }

    fn update(&mut self, id: ReviewId, result: &mut SimulationResult) {
        let rating = self.rng.random_range(1..=5);
        let comment = format!("edited to {rating}");
        match self.reviews.update(
            id,
            ReviewUpdate {
                rating,
                comment: comment.clone(),
            },
        ) {
            Ok(()) => {
                assert!(self.model.contains(id), "updated a review the model lacks");
                self.model.record_update(id, rating, &comment);
                result.updates += 1;
            }
            Err(ReviewError::NotFound(_)) => {
                assert!(!self.model.contains(id), "live review {id} reported missing");
                result.not_found += 1;
            }
            Err(e) => panic!("unexpected update error: {e}"),
        }
    }

    fn delete(&mut self, id: ReviewId, result: &mut SimulationResult) {
        let existed = self.reviews.delete(id).unwrap();
        assert_eq!(existed, self.model.contains(id));
        self.model.record_delete(id);
        result.deletes += 1;
    }

    /// Pick a live id most of the time, otherwise a deleted or unissued one.
    fn pick_id(&mut self) -> ReviewId {
        let live = self.model.live_ids();
        if live.is_empty() || self.rng.random_bool(self.config.missing_id_rate) {
            return ReviewId(self.rng.random_range(1..=self.model.last_id() + 3));
        }
        live[self.rng.random_range(0..live.len())]
    }

    fn check(&self, step: usize, result: &mut SimulationResult) {
        let checker = InvariantChecker::new(&self.reviews, self.store.as_ref());
        result
            .invariant_violations
            .extend(checker.check(&self.model).into_iter().map(|v| (step, v)));
    }
}
