// Life of a request:
// 1. JSON comes in over HTTP
// 2. The api layer extracts and validates it into a review operation
// 3. For reads:
//     - Read the index set (or scan the id counter for the admin listing)
//     - Load each review hash, skipping stale or partial entries
//     - Respond with the records in id order
//    For writes:
//     - Issue one atomic store command per key (counter, hash, index sets)
//     - The durable store appends each command to its log before applying it
//
// System components:
//  - Key-value store (in-memory or command-log backed)
//  - Review index on top of the store
//  - HTTP router

pub mod api;
pub mod config;
pub mod reviews;
pub mod storage;

mod e2e_tests;
mod simulation;
#[cfg(test)]
mod testing;
