//! Key-value storage for the review service.
//!
//! The service only needs a handful of primitives from its store: an atomic
//! counter, hash records, unordered string sets, and key existence/deletion.
//! Every primitive is atomic on its own. There are no multi-command
//! transactions.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process keyspace, lost on restart.
//! - [`DurableStore`]: the same keyspace, backed by an append-only command log
//!   that is replayed on open.
//!
//! # Usage
//!
//! ```
//! use review_server::storage::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! assert_eq!(store.increment("counter").unwrap(), 1);
//! assert_eq!(store.increment("counter").unwrap(), 2);
//! assert!(store.add_member("tags", "a").unwrap());
//! assert_eq!(store.members("tags").unwrap(), vec!["a".to_string()]);
//! ```

mod durable;
mod keyspace;
mod log;
mod memory;
mod time;

use std::collections::BTreeMap;

pub use durable::DurableStore;
pub use keyspace::{Command, Keyspace, ValueKind};
pub use log::{CommandLog, RecoveryResult};
pub use memory::MemoryStore;
pub use time::{SystemTimeSource, TimeSource};

/// The store primitives the review index is built on.
///
/// Implementations must make each method atomic with respect to every other
/// method call. Nothing more is guaranteed.
pub trait KeyValueStore: Send + Sync {
    /// Increment the integer at `key` and return the new value.
    ///
    /// A missing key counts as 0, so the first call returns 1.
    fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Get the scalar value at `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Check whether any value is stored at `key`.
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove the value at `key`. Returns whether something was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Set the given fields of the hash at `key`, creating it if needed.
    ///
    /// Fields not named in `fields` are left untouched.
    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;

    /// Get one field of the hash at `key`.
    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Get every field of the hash at `key`. Empty if the key is absent.
    fn get_all_fields(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError>;

    /// Add `member` to the set at `key`. Returns whether it was newly added.
    fn add_member(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Remove `member` from the set at `key`. Returns whether it was present.
    fn remove_member(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// List the members of the set at `key`, in no particular order.
    fn members(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// Errors returned by store primitives.
#[derive(Debug)]
pub enum StoreError {
    /// The key holds a different kind of value than the command expects.
    WrongType {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// The value at the key is not an integer, or incrementing it overflows.
    NotAnInteger { key: String },
    /// Reading or writing the command log failed.
    Io(std::io::Error),
    /// The command log contains a checksummed record that cannot be decoded.
    CorruptLog { offset: u64, reason: String },
    /// An append failed and could not be rolled back, so the log refuses
    /// further writes until it is reopened.
    LogUnusable { reason: String },
    /// A thread panicked while holding the store lock.
    LockPoisoned,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(f, "key '{key}' holds a {found}, expected a {expected}"),
            Self::NotAnInteger { key } => {
                write!(f, "value at '{key}' is not an integer or out of range")
            }
            Self::Io(e) => write!(f, "store I/O error: {e}"),
            Self::CorruptLog { offset, reason } => {
                write!(f, "corrupt command log at offset {offset}: {reason}")
            }
            Self::LogUnusable { reason } => {
                write!(f, "command log is unusable until reopened: {reason}")
            }
            Self::LockPoisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
