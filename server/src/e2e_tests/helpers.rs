//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::{self, AppState};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::testing::{FaultyStore, review_store_on};

/// A router wired to its own store, plus a runtime to drive it from sync tests.
pub struct TestServer {
    router: Router,
    pub runtime: tokio::runtime::Runtime,
}

impl TestServer {
    /// Create a new test server on a fresh in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::on_store(Arc::new(MemoryStore::new()))
    }

    /// Create a test server on `store`.
    #[must_use]
    pub fn on_store(store: Arc<dyn KeyValueStore>) -> Self {
        let reviews = Arc::new(review_store_on(store));
        let router = api::router(AppState::new(reviews));

        #[allow(clippy::expect_used)]
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

        Self { router, runtime }
    }

    /// Create a test server whose store can be told to fail.
    #[must_use]
    pub fn faulty() -> (Self, Arc<FaultyStore>) {
        let store = Arc::new(FaultyStore::new());
        let server = Self::on_store(store.clone());
        (server, store)
    }

    /// Send a request with an optional JSON body and return the status and
    /// parsed response body (`Value::Null` when the body is empty).
    pub fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|value| value.to_string());
        self.send_raw(method, uri, body)
    }

    /// Like [`Self::send`], but the body is sent verbatim.
    pub fn send_raw(&self, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(text) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };
        let request = request.body(body).unwrap();

        self.runtime.block_on(async {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        })
    }

    pub fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None)
    }

    pub fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None)
    }

    /// Create a review and return its id, asserting the 201.
    pub fn create(&self, course_id: &str, user_id: &str, rating: i64, comment: &str) -> u64 {
        let (status, body) = self.send(
            Method::POST,
            "/reviews",
            Some(json!({
                "course_id": course_id,
                "user_id": user_id,
                "rating": rating,
                "comment": comment,
            })),
        );
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_u64().unwrap()
    }
}

/// The ids of a list response, in order.
pub fn ids(body: &Value) -> Vec<u64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|review| review["id"].as_u64().unwrap())
        .collect()
}
