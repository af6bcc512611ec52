//! Test that a log-backed server keeps its reviews across a restart.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::storage::DurableStore;

#[test]
fn test_reviews_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.log");

    let before = {
        let (store, _) = DurableStore::open(&path, true).unwrap();
        let test = TestServer::on_store(Arc::new(store));
        test.create("CS101", "alice", 5, "great");
        test.create("CS101", "bob", 3, "fine");
        test.create("MA201", "alice", 4, "good");
        test.send(
            Method::PUT,
            "/reviews/1",
            Some(json!({"rating": 4, "comment": "still great"})),
        );
        test.delete("/reviews/2");
        test.get("/admin/reviews").1
    };

    let (store, recovery) = DurableStore::open(&path, true).unwrap();
    assert_eq!(recovery.commands_rejected, 0);
    assert_eq!(recovery.truncated_bytes, 0);
    let test = TestServer::on_store(Arc::new(store));

    assert_eq!(test.get("/admin/reviews").1, before);
    assert_eq!(ids(&test.get("/reviews/course/CS101").1), vec![1]);
    assert_eq!(ids(&test.get("/reviews/user/alice").1), vec![1, 3]);

    // The counter was restored too.
    assert_eq!(test.create("CS102", "carol", 5, "new"), 4);
    assert_eq!(test.get("/reviews/4").0, StatusCode::OK);
}
