//! Test the per-user index.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_user_index_spans_courses() {
    let test = TestServer::new();

    let a = test.create("CS101", "alice", 5, "great");
    let _ = test.create("CS101", "bob", 3, "fine");
    let c = test.create("MA201", "alice", 4, "tough but fair");

    let (status, body) = test.get("/reviews/user/alice");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![a, c]);
    assert!(
        body.as_array()
            .unwrap()
            .iter()
            .all(|review| review["user_id"] == "alice")
    );
}

#[test]
fn test_delete_removes_from_user_index() {
    let test = TestServer::new();

    let a = test.create("CS101", "alice", 5, "great");
    let b = test.create("MA201", "alice", 4, "good");
    test.delete(&format!("/reviews/{a}"));

    assert_eq!(ids(&test.get("/reviews/user/alice").1), vec![b]);
}

#[test]
fn test_unknown_user_is_empty_list() {
    let test = TestServer::new();
    let (status, body) = test.get("/reviews/user/nobody");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}
