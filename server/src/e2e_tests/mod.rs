//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario, driving the full router
//! in-process with deterministic inputs and a pinned clock.

#![cfg(test)]

mod helpers;

mod test_admin_listing;
mod test_camel_case_input;
mod test_course_lifecycle;
mod test_delete_idempotent;
mod test_durable_restart;
mod test_malformed_input;
mod test_store_errors;
mod test_update;
mod test_user_index;
