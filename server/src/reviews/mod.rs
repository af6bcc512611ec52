//! Course reviews on top of a flat key-value store.
//!
//! A review is a hash record. Two secondary indexes, one per course and one per
//! user, are sets of review ids kept next to the records. The store only
//! guarantees atomicity per command, so the record and its index entries are
//! written by separate commands and can drift apart after a crash between
//! them. Nothing detects or repairs such drift.

mod error;
mod index;
pub mod keys;
mod record;

pub use error::ReviewError;
pub use index::{NewReview, ReviewIndexStore, ReviewUpdate};
pub use record::{RecordError, Review, ReviewId, field};
