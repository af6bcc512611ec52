//! Test that store failures surface as 500 instead of empty results.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_index_read_failure_is_server_error() {
    let (test, store) = TestServer::faulty();
    test.create("CS101", "alice", 5, "great");

    store.fail_keys_with_prefix("course:");
    let (status, body) = test.get("/reviews/course/CS101");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("store error:"));

    store.clear_faults();
    assert_eq!(ids(&test.get("/reviews/course/CS101").1), vec![1]);
}

#[test]
fn test_record_read_failure_is_server_error() {
    let (test, store) = TestServer::faulty();
    test.create("CS101", "alice", 5, "great");

    store.fail_keys_with_prefix("review:");
    assert_eq!(test.get("/reviews/user/alice").0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(test.get("/admin/reviews").0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(test.get("/reviews/1").0, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_write_failure_is_server_error() {
    let (test, store) = TestServer::faulty();

    store.fail_keys_with_prefix("review:id");
    let (status, _) = test.send(
        Method::POST,
        "/reviews",
        Some(json!({"course_id": "CS101", "user_id": "alice", "rating": 5, "comment": "great"})),
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    store.fail_keys_with_prefix("user:");
    assert_eq!(test.delete("/reviews/1").0, StatusCode::OK);
}
