//! Test that deleting is idempotent.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_second_delete_succeeds() {
    let test = TestServer::new();
    let id = test.create("CS101", "alice", 5, "great");

    for _ in 0..2 {
        let (status, ack) = test.delete(&format!("/reviews/{id}"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({"message": "deleted", "id": id}));
    }

    assert_eq!(test.get(&format!("/reviews/{id}")).0, StatusCode::NOT_FOUND);
    assert_eq!(test.get("/reviews/course/CS101").1, json!([]));
    assert_eq!(test.get("/reviews/user/alice").1, json!([]));
}

#[test]
fn test_delete_never_issued_id() {
    let test = TestServer::new();
    let (status, ack) = test.delete("/reviews/12345");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"message": "deleted", "id": 12345}));
}
