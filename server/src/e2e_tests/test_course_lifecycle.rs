//! Test the create, list by course, delete, list again lifecycle.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_create_list_delete_course_review() {
    let test = TestServer::new();

    let (status, created) = test.send(
        axum::http::Method::POST,
        "/reviews",
        Some(serde_json::json!({
            "course_id": "CS101",
            "user_id": "alice",
            "rating": 5,
            "comment": "great",
        })),
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["course_id"], "CS101");
    assert_eq!(created["user_id"], "alice");
    assert_eq!(created["rating"], 5);
    assert_eq!(created["comment"], "great");
    assert_eq!(created["created_at"], "2026-10-19T12:00:00Z");

    let (status, listed) = test.get("/reviews/course/CS101");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, serde_json::json!([created]));

    let (status, ack) = test.delete("/reviews/1");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, serde_json::json!({"message": "deleted", "id": 1}));

    let (status, listed) = test.get("/reviews/course/CS101");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, serde_json::json!([]));
}

#[test]
fn test_ids_are_strictly_increasing_and_not_reused() {
    let test = TestServer::new();

    let first = test.create("CS101", "alice", 5, "great");
    let second = test.create("CS101", "bob", 3, "fine");
    test.delete(&format!("/reviews/{second}"));
    let third = test.create("CS102", "alice", 4, "good");

    assert_eq!((first, second, third), (1, 2, 3));
}

#[test]
fn test_course_index_is_per_course() {
    let test = TestServer::new();

    let a = test.create("CS101", "alice", 5, "great");
    let b = test.create("CS102", "alice", 2, "hard");
    let c = test.create("CS101", "bob", 4, "good");

    assert_eq!(ids(&test.get("/reviews/course/CS101").1), vec![a, c]);
    assert_eq!(ids(&test.get("/reviews/course/CS102").1), vec![b]);
}

#[test]
fn test_unknown_course_is_empty_list() {
    let test = TestServer::new();
    let (status, body) = test.get("/reviews/course/NOPE");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[test]
fn test_get_single_review() {
    let test = TestServer::new();
    let id = test.create("CS101", "alice", 5, "great");

    let (status, body) = test.get(&format!("/reviews/{id}"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comment"], "great");

    let (status, body) = test.get("/reviews/99");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({"error": "review 99 not found"}));
}
