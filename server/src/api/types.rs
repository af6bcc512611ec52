//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::reviews::{NewReview, ReviewId, ReviewUpdate};

/// Body of `POST /reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(alias = "courseId")]
    pub course_id: String,
    #[serde(alias = "userId")]
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
}

impl From<CreateReviewRequest> for NewReview {
    fn from(request: CreateReviewRequest) -> Self {
        Self {
            course_id: request.course_id,
            user_id: request.user_id,
            rating: request.rating,
            comment: request.comment,
        }
    }
}

/// Body of `PUT /reviews/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i64,
    pub comment: String,
}

impl From<UpdateReviewRequest> for ReviewUpdate {
    fn from(request: UpdateReviewRequest) -> Self {
        Self {
            rating: request.rating,
            comment: request.comment,
        }
    }
}

/// Acknowledgement for writes that do not return the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
    pub id: ReviewId,
}

impl Ack {
    pub fn updated(id: ReviewId) -> Self {
        Self {
            message: "updated".to_string(),
            id,
        }
    }

    pub fn deleted(id: ReviewId) -> Self {
        Self {
            message: "deleted".to_string(),
            id,
        }
    }
}
