//! Test that unusable requests are rejected with 400 and write nothing.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

fn assert_bad_request(test: &TestServer, (status, body): (StatusCode, serde_json::Value)) {
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    assert!(body["error"].is_string(), "body: {body}");
    // Nothing was created and no id was consumed.
    assert_eq!(test.get("/admin/reviews").1, json!([]));
}

#[test]
fn test_invalid_json_body() {
    let test = TestServer::new();
    let response = test.send_raw(Method::POST, "/reviews", Some("{not json".to_string()));
    assert_bad_request(&test, response);
}

#[test]
fn test_missing_field() {
    let test = TestServer::new();
    let response = test.send(
        Method::POST,
        "/reviews",
        Some(json!({"course_id": "CS101", "rating": 5, "comment": "great"})),
    );
    assert_bad_request(&test, response);
}

#[test]
fn test_wrong_field_type() {
    let test = TestServer::new();
    let response = test.send(
        Method::POST,
        "/reviews",
        Some(json!({"course_id": "CS101", "user_id": "alice", "rating": "five", "comment": "great"})),
    );
    assert_bad_request(&test, response);
}

#[test]
fn test_empty_course_id() {
    let test = TestServer::new();
    let (status, body) = test.send(
        Method::POST,
        "/reviews",
        Some(json!({"course_id": "", "user_id": "alice", "rating": 5, "comment": "great"})),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "course_id must not be empty"}));

    // The rejected create did not consume id 1.
    assert_eq!(test.create("CS101", "alice", 5, "great"), 1);
}

#[test]
fn test_non_numeric_id() {
    let test = TestServer::new();
    let (status, body) = test.get("/reviews/abc");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = test.delete("/reviews/-1");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_update_with_missing_comment() {
    let test = TestServer::new();
    let id = test.create("CS101", "alice", 5, "great");

    let (status, _) = test.send(Method::PUT, &format!("/reviews/{id}"), Some(json!({"rating": 1})));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, review) = test.get(&format!("/reviews/{id}"));
    assert_eq!(review["rating"], 5);
    assert_eq!(review["comment"], "great");
}
