//! Append-only command log.
//!
//! Every mutating command applied to a [`DurableStore`](crate::storage::DurableStore)
//! is first appended to this log. Reopening the store replays the log from the
//! beginning.
//!
//! # Log Record Format
//!
//! Each record has the following layout:
//! ```text
//! +----------+--------------------------------------------------+
//! | 0-3      | record_length (4 bytes, includes header+payload) |
//! | 4        | command_type (1 byte)                            |
//! | 5-N      | payload (variable, depends on type)              |
//! | N-N+3    | CRC32 checksum (4 bytes)                         |
//! +----------+--------------------------------------------------+
//! ```
//!
//! Strings in the payload are a 4-byte little-endian length followed by UTF-8
//! bytes. A `SetFields` payload is the key, a 4-byte field count, then each
//! field name and value.
//!
//! # Torn Writes
//!
//! A crash in the middle of an append leaves a short or checksum-failing record
//! at the end of the file. Recovery truncates the file at such a trailing
//! record. A checksum failure on a record followed by more data, or a record
//! whose checksum is valid but whose payload cannot be decoded, is real
//! corruption: the open fails and the file is left untouched.
//!
//! A failed append is truncated back to the last record boundary. If that
//! truncation fails too, the log refuses every later append.

// record_length and string lengths fit in u32, checked before writing
#![allow(clippy::cast_possible_truncation)]

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::storage::{Command, StoreError};

/// Record header size: `record_length` (4) + `command_type` (1).
const RECORD_HEADER_SIZE: usize = 5;

/// CRC32 checksum size at end of record.
const CHECKSUM_SIZE: usize = 4;

/// Largest record the log accepts: 16MB.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Command types as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum CommandType {
    Increment = 0x01,
    SetFields = 0x02,
    Delete = 0x03,
    AddMember = 0x04,
    RemoveMember = 0x05,
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Increment),
            0x02 => Ok(Self::SetFields),
            0x03 => Ok(Self::Delete),
            0x04 => Ok(Self::AddMember),
            0x05 => Ok(Self::RemoveMember),
            _ => Err(value),
        }
    }
}

impl Command {
    const fn command_type(&self) -> CommandType {
        match self {
            Self::Increment { .. } => CommandType::Increment,
            Self::SetFields { .. } => CommandType::SetFields,
            Self::Delete { .. } => CommandType::Delete,
            Self::AddMember { .. } => CommandType::AddMember,
            Self::RemoveMember { .. } => CommandType::RemoveMember,
        }
    }

    fn encode_payload(&self, out: &mut Vec<u8>) {
        match self {
            Self::Increment { key } | Self::Delete { key } => put_str(out, key),
            Self::SetFields { key, fields } => {
                put_str(out, key);
                out.extend_from_slice(&(fields.len() as u32).to_le_bytes());
                for (name, value) in fields {
                    put_str(out, name);
                    put_str(out, value);
                }
            }
            Self::AddMember { key, member } | Self::RemoveMember { key, member } => {
                put_str(out, key);
                put_str(out, member);
            }
        }
    }

    fn decode_payload(command_type: CommandType, bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader { bytes, position: 0 };
        let command = match command_type {
            CommandType::Increment => Self::Increment {
                key: reader.string()?,
            },
            CommandType::Delete => Self::Delete {
                key: reader.string()?,
            },
            CommandType::SetFields => {
                let key = reader.string()?;
                let count = reader.u32()? as usize;
                let mut fields = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let name = reader.string()?;
                    let value = reader.string()?;
                    fields.push((name, value));
                }
                Self::SetFields { key, fields }
            }
            CommandType::AddMember => Self::AddMember {
                key: reader.string()?,
                member: reader.string()?,
            },
            CommandType::RemoveMember => Self::RemoveMember {
                key: reader.string()?,
                member: reader.string()?,
            },
        };

        if reader.position != bytes.len() {
            return Err(DecodeError::Malformed("trailing payload bytes".to_string()));
        }
        Ok(command)
    }
}

/// Serialize a command into a complete log record.
#[must_use]
pub fn encode_record(command: &Command) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(64);

    // Placeholder length, patched once the payload is written
    bytes.extend_from_slice(&[0u8; 4]);
    bytes.push(command.command_type() as u8);
    command.encode_payload(&mut bytes);

    let total_len = (bytes.len() + CHECKSUM_SIZE) as u32;
    bytes[0..4].copy_from_slice(&total_len.to_le_bytes());

    // CRC32 checksum - computed over everything before it
    let checksum = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes
}

/// Deserialize one record from the front of `bytes`.
///
/// Returns the command and the number of bytes consumed.
fn decode_record(bytes: &[u8]) -> Result<(Command, usize), DecodeError> {
    if bytes.len() < RECORD_HEADER_SIZE + CHECKSUM_SIZE {
        return Err(DecodeError::Torn);
    }

    let record_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if record_len < RECORD_HEADER_SIZE + CHECKSUM_SIZE || record_len > bytes.len() {
        return Err(DecodeError::Torn);
    }

    let stored_checksum = u32::from_le_bytes([
        bytes[record_len - 4],
        bytes[record_len - 3],
        bytes[record_len - 2],
        bytes[record_len - 1],
    ]);
    let computed_checksum = crc32fast::hash(&bytes[..record_len - CHECKSUM_SIZE]);
    if stored_checksum != computed_checksum {
        return Err(DecodeError::ChecksumMismatch {
            expected: stored_checksum,
            actual: computed_checksum,
            record_len,
        });
    }

    let command_type = CommandType::try_from(bytes[4]).map_err(DecodeError::InvalidCommandType)?;
    let payload = &bytes[RECORD_HEADER_SIZE..record_len - CHECKSUM_SIZE];
    let command = Command::decode_payload(command_type, payload)?;
    Ok((command, record_len))
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

struct PayloadReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl PayloadReader<'_> {
    fn u32(&mut self) -> Result<u32, DecodeError> {
        let end = self.position + 4;
        let slice = self
            .bytes
            .get(self.position..end)
            .ok_or_else(|| DecodeError::Malformed("truncated length".to_string()))?;
        self.position = end;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let end = self
            .position
            .checked_add(len)
            .ok_or_else(|| DecodeError::Malformed("string length overflow".to_string()))?;
        let slice = self
            .bytes
            .get(self.position..end)
            .ok_or_else(|| DecodeError::Malformed("truncated string".to_string()))?;
        self.position = end;
        String::from_utf8(slice.to_vec())
            .map_err(|e| DecodeError::Malformed(format!("invalid UTF-8: {e}")))
    }
}

/// Why a record could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DecodeError {
    /// The record runs past the end of the log.
    Torn,
    /// The stored checksum does not match the record bytes.
    ChecksumMismatch {
        expected: u32,
        actual: u32,
        record_len: usize,
    },
    /// Checksum is valid but the command type is unknown.
    InvalidCommandType(u8),
    /// Checksum is valid but the payload does not parse.
    Malformed(String),
}

impl DecodeError {
    /// Whether this looks like an interrupted append rather than corruption,
    /// given the number of log bytes from the start of the record to the end
    /// of the file. Only the last record can be torn.
    const fn is_torn_write(&self, remaining: usize) -> bool {
        match self {
            Self::Torn => true,
            Self::ChecksumMismatch { record_len, .. } => *record_len == remaining,
            Self::InvalidCommandType(_) | Self::Malformed(_) => false,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Torn => write!(f, "record extends past end of log"),
            Self::ChecksumMismatch {
                expected, actual, ..
            } => write!(
                f,
                "checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
            Self::InvalidCommandType(t) => write!(f, "invalid command type: {t:#04x}"),
            Self::Malformed(reason) => write!(f, "malformed payload: {reason}"),
        }
    }
}

/// Result of replaying a command log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records read back from the log.
    pub records_scanned: usize,
    /// Commands that were rejected again on replay (they were rejected originally too).
    pub commands_rejected: usize,
    /// Bytes cut off the end of the log because of a torn write.
    pub truncated_bytes: u64,
}

/// An open command log positioned at its end.
pub struct CommandLog {
    file: File,
    /// Byte length of the valid log.
    len: u64,
    /// Whether to fsync after every append.
    sync_writes: bool,
    /// Set when a failed append could not be rolled back.
    unusable: Option<String>,
}

impl CommandLog {
    /// Open the log at `path`, creating it if it does not exist.
    ///
    /// Returns the log positioned for appending, every command recorded in it
    /// in order, and the number of bytes truncated from a torn tail.
    pub fn open(path: &Path, sync_writes: bool) -> Result<(Self, Vec<Command>, u64), StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let mut commands = Vec::new();
        let mut offset = 0usize;
        while offset < contents.len() {
            match decode_record(&contents[offset..]) {
                Ok((command, consumed)) => {
                    commands.push(command);
                    offset += consumed;
                }
                Err(e) if e.is_torn_write(contents.len() - offset) => {
                    tracing::warn!(
                        "command log {} has a torn record at offset {offset}: {e}",
                        path.display()
                    );
                    break;
                }
                Err(e) => {
                    return Err(StoreError::CorruptLog {
                        offset: offset as u64,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let valid_len = offset as u64;
        let truncated_bytes = contents.len() as u64 - valid_len;
        if truncated_bytes > 0 {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        let log = Self {
            file,
            len: valid_len,
            sync_writes,
            unusable: None,
        };
        Ok((log, commands, truncated_bytes))
    }

    /// Append one command to the end of the log.
    pub fn append(&mut self, command: &Command) -> Result<(), StoreError> {
        let bytes = encode_record(command);
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "record for key '{}' is {} bytes, limit is {MAX_RECORD_SIZE}",
                    command.key(),
                    bytes.len()
                ),
            )));
        }

        if let Some(reason) = &self.unusable {
            return Err(StoreError::LogUnusable {
                reason: reason.clone(),
            });
        }

        if let Err(e) = self.write_record(&bytes) {
            // The record must not survive a reported failure, or replay would
            // apply a write the caller saw fail.
            if let Err(rollback) = self.truncate_to_len() {
                let reason = format!("append failed ({e}), rollback failed ({rollback})");
                tracing::error!("command log: {reason}");
                self.unusable = Some(reason.clone());
                return Err(StoreError::LogUnusable { reason });
            }
            return Err(e.into());
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn write_record(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file back to the last record boundary.
    fn truncate_to_len(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.seek(SeekFrom::Start(self.len))?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Current length of the log in bytes.
    #[cfg(test)]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[cfg(test)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_commands() -> Vec<Command> {
        vec![
            Command::Increment {
                key: "review:id".to_string(),
            },
            Command::SetFields {
                key: "review:1".to_string(),
                fields: vec![
                    ("course_id".to_string(), "CS101".to_string()),
                    ("comment".to_string(), "naïve but fine".to_string()),
                ],
            },
            Command::AddMember {
                key: "course:CS101:reviews".to_string(),
                member: "1".to_string(),
            },
            Command::RemoveMember {
                key: "course:CS101:reviews".to_string(),
                member: "1".to_string(),
            },
            Command::Delete {
                key: "review:1".to_string(),
            },
        ]
    }

    #[test]
    fn test_record_layout() {
        let command = Command::Delete {
            key: "k".to_string(),
        };
        let bytes = encode_record(&command);

        // header (5) + string length (4) + "k" (1) + checksum (4)
        assert_eq!(bytes.len(), 14);
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 14);
        assert_eq!(bytes[4], CommandType::Delete as u8);

        let (decoded, consumed) = decode_record(&bytes).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_checksum_detects_bit_flip() {
        let mut bytes = encode_record(&Command::Increment {
            key: "review:id".to_string(),
        });
        bytes[7] ^= 0x01;
        assert!(matches!(
            decode_record(&bytes),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_reopen_returns_commands_in_order() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        {
            let (mut log, commands, truncated) = CommandLog::open(&path, false).unwrap();
            assert!(commands.is_empty());
            assert_eq!(truncated, 0);
            for command in sample_commands() {
                log.append(&command).unwrap();
            }
            assert!(!log.is_empty());
        }

        let (log, commands, truncated) = CommandLog::open(&path, false).unwrap();
        assert_eq!(commands, sample_commands());
        assert_eq!(truncated, 0);
        assert_eq!(log.len(), std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        let full_len = {
            let (mut log, _, _) = CommandLog::open(&path, true).unwrap();
            for command in sample_commands() {
                log.append(&command).unwrap();
            }
            log.len()
        };

        // Simulate a crash halfway through the last append.
        let last = encode_record(sample_commands().last().unwrap());
        let torn_len = full_len - (last.len() as u64 / 2);
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(torn_len)
            .unwrap();

        let (mut log, commands, truncated) = CommandLog::open(&path, false).unwrap();
        assert_eq!(commands.len(), sample_commands().len() - 1);
        assert_eq!(truncated, torn_len - (full_len - last.len() as u64));

        // Appending after recovery starts on a clean record boundary.
        log.append(&Command::Increment {
            key: "review:id".to_string(),
        })
        .unwrap();
        drop(log);
        let (_, commands, truncated) = CommandLog::open(&path, false).unwrap();
        assert_eq!(commands.len(), sample_commands().len());
        assert_eq!(truncated, 0);
    }

    #[test]
    fn test_unknown_command_type_fails_open() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        let mut bytes = encode_record(&Command::Delete {
            key: "k".to_string(),
        });
        bytes[4] = 0x7f;
        let len = bytes.len();
        let checksum = crc32fast::hash(&bytes[..len - CHECKSUM_SIZE]);
        bytes[len - CHECKSUM_SIZE..].copy_from_slice(&checksum.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let result = CommandLog::open(&path, false);
        assert!(matches!(
            result,
            Err(StoreError::CorruptLog { offset: 0, .. })
        ));
    }

    #[test]
    fn test_checksum_mismatch_mid_log_fails_open() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        let increment = Command::Increment {
            key: "review:id".to_string(),
        };
        let record_len = encode_record(&increment).len();
        {
            let (mut log, _, _) = CommandLog::open(&path, false).unwrap();
            for _ in 0..5 {
                log.append(&increment).unwrap();
            }
        }

        // Flip one payload bit in the second of five records.
        let mut bytes = std::fs::read(&path).unwrap();
        let original_len = bytes.len();
        bytes[record_len + RECORD_HEADER_SIZE + 2] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let result = CommandLog::open(&path, false);
        assert!(
            matches!(result, Err(StoreError::CorruptLog { offset, .. }) if offset == record_len as u64)
        );
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            original_len as u64,
            "corrupt log must not be truncated"
        );
    }

    #[test]
    fn test_checksum_mismatch_on_last_record_is_truncated() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        {
            let (mut log, _, _) = CommandLog::open(&path, false).unwrap();
            for command in sample_commands() {
                log.append(&command).unwrap();
            }
        }

        let mut bytes = std::fs::read(&path).unwrap();
        let last_len = encode_record(sample_commands().last().unwrap()).len();
        let last_start = bytes.len() - last_len;
        bytes[last_start + RECORD_HEADER_SIZE] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let (log, commands, truncated) = CommandLog::open(&path, false).unwrap();
        assert_eq!(commands.len(), sample_commands().len() - 1);
        assert_eq!(truncated, last_len as u64);
        assert_eq!(log.len(), last_start as u64);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rollback_makes_log_unusable() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reviews.log");

        let len = {
            let (mut log, _, _) = CommandLog::open(&path, false).unwrap();
            log.append(&Command::Increment {
                key: "review:id".to_string(),
            })
            .unwrap();
            log.len()
        };

        // A read-only handle fails both the write and the truncation.
        let mut log = CommandLog {
            file: File::open(&path).unwrap(),
            len,
            sync_writes: false,
            unusable: None,
        };
        let command = Command::Delete {
            key: "review:1".to_string(),
        };
        assert!(matches!(
            log.append(&command),
            Err(StoreError::LogUnusable { .. })
        ));
        assert!(matches!(
            log.append(&command),
            Err(StoreError::LogUnusable { .. })
        ));
        assert_eq!(log.len(), len);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    }
}
