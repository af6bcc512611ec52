//! Route handlers. Each one translates HTTP to a single review operation.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::api::error::ApiError;
use crate::api::types::{Ack, CreateReviewRequest, UpdateReviewRequest};
use crate::api::AppState;
use crate::reviews::{Review, ReviewId};

/// `POST /reviews`
pub async fn create_review(
    State(state): State<AppState>,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let Json(request) = body?;
    let review = state.reviews.create(request.into())?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews/{id}`
pub async fn get_review(
    State(state): State<AppState>,
    id: Result<Path<ReviewId>, PathRejection>,
) -> Result<Json<Review>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.reviews.get(id)?))
}

/// `GET /reviews/course/{course_id}`
pub async fn reviews_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.reviews.get_by_course(&course_id)?))
}

/// `GET /reviews/user/{user_id}`
pub async fn reviews_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.reviews.get_by_user(&user_id)?))
}

/// `PUT /reviews/{id}`
pub async fn update_review(
    State(state): State<AppState>,
    id: Result<Path<ReviewId>, PathRejection>,
    body: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Path(id) = id?;
    let Json(request) = body?;
    state.reviews.update(id, request.into())?;
    Ok(Json(Ack::updated(id)))
}

/// `DELETE /reviews/{id}`
///
/// Succeeds whether or not the review existed.
pub async fn delete_review(
    State(state): State<AppState>,
    id: Result<Path<ReviewId>, PathRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Path(id) = id?;
    state.reviews.delete(id)?;
    Ok(Json(Ack::deleted(id)))
}

/// `GET /admin/reviews`
pub async fn list_all_reviews(
    State(state): State<AppState>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.reviews.list_all()?))
}
