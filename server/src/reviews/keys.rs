//! Key naming for reviews and their secondary indexes.
//!
//! | Key                          | Kind   | Content                      |
//! |------------------------------|--------|------------------------------|
//! | `review:id`                  | scalar | last issued review id        |
//! | `review:{id}`                | hash   | the review record            |
//! | `course:{course_id}:reviews` | set    | ids of the course's reviews  |
//! | `user:{user_id}:reviews`     | set    | ids of the user's reviews    |
//!
//! Review ids are decimal, so `review:id` never collides with a record key.

use crate::reviews::ReviewId;

/// Counter holding the last issued review id.
pub const ID_COUNTER_KEY: &str = "review:id";

#[must_use]
pub fn record_key(id: ReviewId) -> String {
    format!("review:{id}")
}

#[must_use]
pub fn course_index_key(course_id: &str) -> String {
    format!("course:{course_id}:reviews")
}

#[must_use]
pub fn user_index_key(user_id: &str) -> String {
    format!("user:{user_id}:reviews")
}
