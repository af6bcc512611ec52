//! Test that create accepts camelCase ids.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_create_with_camel_case_fields() {
    let test = TestServer::new();

    let (status, body) = test.send(
        Method::POST,
        "/reviews",
        Some(json!({
            "courseId": "CS101",
            "userId": "alice",
            "rating": 4,
            "comment": "solid",
        })),
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["course_id"], "CS101");
    assert_eq!(body["user_id"], "alice");

    assert_eq!(ids(&test.get("/reviews/user/alice").1), vec![1]);
}
