//! HTTP surface of the review service.
//!
//! | Method & Path                    | Success            |
//! |----------------------------------|--------------------|
//! | `POST /reviews`                  | 201 + record       |
//! | `GET /reviews/{id}`              | 200 + record       |
//! | `PUT /reviews/{id}`              | 200 + ack          |
//! | `DELETE /reviews/{id}`           | 200 + ack          |
//! | `GET /reviews/course/{course_id}`| 200 + list         |
//! | `GET /reviews/user/{user_id}`    | 200 + list         |
//! | `GET /admin/reviews`             | 200 + list         |

mod error;
mod handlers;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::reviews::ReviewIndexStore;

pub use error::ApiError;
pub use types::{Ack, CreateReviewRequest, UpdateReviewRequest};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub reviews: Arc<ReviewIndexStore>,
}

impl AppState {
    #[must_use]
    pub const fn new(reviews: Arc<ReviewIndexStore>) -> Self {
        Self { reviews }
    }
}

/// Build the router with every review route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reviews", post(handlers::create_review))
        .route(
            "/reviews/{id}",
            get(handlers::get_review)
                .put(handlers::update_review)
                .delete(handlers::delete_review),
        )
        .route("/reviews/course/{course_id}", get(handlers::reviews_by_course))
        .route("/reviews/user/{user_id}", get(handlers::reviews_by_user))
        .route("/admin/reviews", get(handlers::list_all_reviews))
        .with_state(state)
}
