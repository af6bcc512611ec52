//! Log-backed store backend.
//!
//! Mutations are written ahead to a [`CommandLog`] and then applied to an
//! in-memory [`Keyspace`]. Reads are served from the keyspace.
//!
//! # Invariants
//!
//! - A command is applied to the keyspace only after it was appended.
//! - Replay applies the logged commands in order, so a reopened store holds
//!   the same keyspace as before the restart.
//! - A command the keyspace rejected (for example `WrongType`) is still logged,
//!   and is rejected again on replay with no effect.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::storage::{Command, CommandLog, KeyValueStore, Keyspace, RecoveryResult, StoreError};

struct DurableState {
    keyspace: Keyspace,
    log: CommandLog,
}

/// A [`KeyValueStore`] that survives restarts.
pub struct DurableStore {
    state: Mutex<DurableState>,
}

impl DurableStore {
    /// Open the store backed by the log at `path`, replaying it.
    ///
    /// The log is created if it does not exist.
    pub fn open(path: &Path, sync_writes: bool) -> Result<(Self, RecoveryResult), StoreError> {
        let (log, commands, truncated_bytes) = CommandLog::open(path, sync_writes)?;

        let mut keyspace = Keyspace::new();
        let mut result = RecoveryResult {
            records_scanned: commands.len(),
            commands_rejected: 0,
            truncated_bytes,
        };
        for command in &commands {
            if let Err(e) = keyspace.apply(command) {
                tracing::debug!("replayed command on '{}' rejected: {e}", command.key());
                result.commands_rejected += 1;
            }
        }

        let store = Self {
            state: Mutex::new(DurableState { keyspace, log }),
        };
        Ok((store, result))
    }

    fn lock(&self) -> Result<MutexGuard<'_, DurableState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KeyValueStore for DurableStore {
    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut state = self.lock()?;
        state.log.append(&Command::Increment {
            key: key.to_owned(),
        })?;
        state.keyspace.increment(key)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.keyspace.get(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.keyspace.exists(key))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        // Deleting a missing key changes nothing, so it is not logged.
        if !state.keyspace.exists(key) {
            return Ok(false);
        }
        state.log.append(&Command::Delete {
            key: key.to_owned(),
        })?;
        Ok(state.keyspace.delete(key))
    }

    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.log.append(&Command::SetFields {
            key: key.to_owned(),
            fields: fields
                .iter()
                .map(|(name, value)| ((*name).to_owned(), value.to_owned()))
                .collect(),
        })?;
        state.keyspace.set_fields(key, fields)
    }

    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.keyspace.get_field(key, field)
    }

    fn get_all_fields(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.lock()?.keyspace.get_all_fields(key)
    }

    fn add_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.log.append(&Command::AddMember {
            key: key.to_owned(),
            member: member.to_owned(),
        })?;
        state.keyspace.add_member(key, member)
    }

    fn remove_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if !state.keyspace.exists(key) {
            return Ok(false);
        }
        state.log.append(&Command::RemoveMember {
            key: key.to_owned(),
            member: member.to_owned(),
        })?;
        state.keyspace.remove_member(key, member)
    }

    fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.lock()?.keyspace.members(key)
    }
}
