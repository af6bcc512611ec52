//! Test updating a review's rating and comment.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_update_changes_only_mutable_fields() {
    let test = TestServer::new();
    let id = test.create("CS101", "alice", 5, "great");
    let (_, before) = test.get(&format!("/reviews/{id}"));

    let (status, ack) = test.send(
        Method::PUT,
        &format!("/reviews/{id}"),
        Some(json!({"rating": 2, "comment": "changed my mind"})),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"message": "updated", "id": id}));

    let (_, after) = test.get(&format!("/reviews/{id}"));
    assert_eq!(after["rating"], 2);
    assert_eq!(after["comment"], "changed my mind");
    for unchanged in ["id", "course_id", "user_id", "created_at"] {
        assert_eq!(after[unchanged], before[unchanged], "{unchanged} changed");
    }

    // Still indexed once.
    assert_eq!(ids(&test.get("/reviews/course/CS101").1), vec![id]);
}

#[test]
fn test_update_missing_review_is_not_found() {
    let test = TestServer::new();

    let (status, body) = test.send(
        Method::PUT,
        "/reviews/7",
        Some(json!({"rating": 1, "comment": "ghost"})),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "review 7 not found"}));

    // No partial record appears anywhere.
    assert_eq!(test.get("/reviews/7").0, StatusCode::NOT_FOUND);
    assert_eq!(test.get("/admin/reviews").1, json!([]));
}

#[test]
fn test_update_after_delete_is_not_found() {
    let test = TestServer::new();
    let id = test.create("CS101", "alice", 5, "great");
    test.delete(&format!("/reviews/{id}"));

    let (status, _) = test.send(
        Method::PUT,
        &format!("/reviews/{id}"),
        Some(json!({"rating": 1, "comment": "too late"})),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}
