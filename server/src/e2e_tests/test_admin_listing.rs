//! Test the admin listing of every review.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_list_all_skips_deleted() {
    let test = TestServer::new();

    let created: Vec<u64> = (0..5)
        .map(|n| test.create(&format!("CS10{n}"), "alice", n, "ok"))
        .collect();
    assert_eq!(created, vec![1, 2, 3, 4, 5]);

    let (status, body) = test.get("/admin/reviews");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), created);

    test.delete("/reviews/3");
    assert_eq!(ids(&test.get("/admin/reviews").1), vec![1, 2, 4, 5]);
}

#[test]
fn test_list_all_on_empty_store() {
    let test = TestServer::new();
    let (status, body) = test.get("/admin/reviews");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
