//! The keyspace shared by every store backend.
//!
//! A keyspace maps keys to one of three kinds of values: scalars, hashes and
//! sets. It is not synchronized; backends wrap it in a lock and hold that lock
//! for exactly one command.
//!
//! Mutations are also expressed as [`Command`] values so the durable backend
//! can log them and replay them through [`Keyspace::apply`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::storage::StoreError;

/// The kind of value stored at a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Hash,
    Set,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Hash => write!(f, "hash"),
            Self::Set => write!(f, "set"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Scalar(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

impl Value {
    const fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Hash(_) => ValueKind::Hash,
            Self::Set(_) => ValueKind::Set,
        }
    }
}

/// A mutating store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Increment {
        key: String,
    },
    SetFields {
        key: String,
        fields: Vec<(String, String)>,
    },
    Delete {
        key: String,
    },
    AddMember {
        key: String,
        member: String,
    },
    RemoveMember {
        key: String,
        member: String,
    },
}

impl Command {
    /// The key this command mutates.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Increment { key }
            | Self::SetFields { key, .. }
            | Self::Delete { key }
            | Self::AddMember { key, .. }
            | Self::RemoveMember { key, .. } => key,
        }
    }
}

/// Unsynchronized map from keys to values.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<String, Value>,
}

impl Keyspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a logged command.
    pub fn apply(&mut self, command: &Command) -> Result<(), StoreError> {
        match command {
            Command::Increment { key } => self.increment(key).map(|_| ()),
            Command::SetFields { key, fields } => {
                let fields: Vec<(&str, String)> = fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.to_owned()))
                    .collect();
                self.set_fields(key, &fields)
            }
            Command::Delete { key } => {
                self.delete(key);
                Ok(())
            }
            Command::AddMember { key, member } => self.add_member(key, member).map(|_| ()),
            Command::RemoveMember { key, member } => self.remove_member(key, member).map(|_| ()),
        }
    }

    pub fn increment(&mut self, key: &str) -> Result<i64, StoreError> {
        match self.entries.get_mut(key) {
            None => {
                self.entries
                    .insert(key.to_owned(), Value::Scalar("1".to_owned()));
                Ok(1)
            }
            Some(Value::Scalar(current)) => {
                let next = current
                    .parse::<i64>()
                    .ok()
                    .and_then(|n| n.checked_add(1))
                    .ok_or_else(|| StoreError::NotAnInteger {
                        key: key.to_owned(),
                    })?;
                *current = next.to_string();
                Ok(next)
            }
            Some(other) => Err(wrong_type(key, ValueKind::Scalar, other)),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Scalar(value)) => Ok(Some(value.to_owned())),
            Some(other) => Err(wrong_type(key, ValueKind::Scalar, other)),
        }
    }

    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn set_fields(&mut self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        // An empty write must not leave an empty hash behind.
        if fields.is_empty() {
            return match self.entries.get(key) {
                None | Some(Value::Hash(_)) => Ok(()),
                Some(other) => Err(wrong_type(key, ValueKind::Hash, other)),
            };
        }

        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Value::Hash(BTreeMap::new()));
        match entry {
            Value::Hash(hash) => {
                for (name, value) in fields {
                    hash.insert((*name).to_owned(), value.to_owned());
                }
                Ok(())
            }
            other => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    pub fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(other) => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    pub fn get_all_fields(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        match self.entries.get(key) {
            None => Ok(BTreeMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(other) => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    pub fn add_member(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Value::Set(BTreeSet::new()));
        match entry {
            Value::Set(set) => Ok(set.insert(member.to_owned())),
            other => Err(wrong_type(key, ValueKind::Set, other)),
        }
    }

    pub fn remove_member(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        let (removed, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(set)) => (set.remove(member), set.is_empty()),
            Some(other) => return Err(wrong_type(key, ValueKind::Set, other)),
        };

        // Empty sets do not keep their key alive.
        if now_empty {
            self.entries.remove(key);
        }
        Ok(removed)
    }

    pub fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, ValueKind::Set, other)),
        }
    }
}

fn wrong_type(key: &str, expected: ValueKind, found: &Value) -> StoreError {
    StoreError::WrongType {
        key: key.to_owned(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_starts_at_one() {
        let mut keyspace = Keyspace::new();
        assert_eq!(keyspace.increment("n").unwrap(), 1);
        assert_eq!(keyspace.increment("n").unwrap(), 2);
        assert_eq!(keyspace.get("n").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_increment_rejects_non_integer() {
        let mut keyspace = Keyspace::new();
        keyspace
            .apply(&Command::SetFields {
                key: "h".to_string(),
                fields: vec![("a".to_string(), "1".to_string())],
            })
            .unwrap();
        assert!(matches!(
            keyspace.increment("h"),
            Err(StoreError::WrongType {
                expected: ValueKind::Scalar,
                found: ValueKind::Hash,
                ..
            })
        ));
    }

    #[test]
    fn test_increment_overflow() {
        let mut keyspace = Keyspace::new();
        keyspace.entries.insert(
            "n".to_string(),
            Value::Scalar(i64::MAX.to_string()),
        );
        assert!(matches!(
            keyspace.increment("n"),
            Err(StoreError::NotAnInteger { .. })
        ));
        assert_eq!(keyspace.get("n").unwrap(), Some(i64::MAX.to_string()));
    }

    #[test]
    fn test_set_fields_merges() {
        let mut keyspace = Keyspace::new();
        keyspace
            .set_fields("h", &[("a", "1".to_string()), ("b", "2".to_string())])
            .unwrap();
        keyspace.set_fields("h", &[("b", "3".to_string())]).unwrap();

        let fields = keyspace.get_all_fields("h").unwrap();
        assert_eq!(fields.get("a").map(String::as_str), Some("1"));
        assert_eq!(fields.get("b").map(String::as_str), Some("3"));
        assert_eq!(keyspace.get_field("h", "c").unwrap(), None);
    }

    #[test]
    fn test_empty_set_fields_creates_nothing() {
        let mut keyspace = Keyspace::new();
        keyspace.set_fields("h", &[]).unwrap();
        assert!(!keyspace.exists("h"));
    }

    #[test]
    fn test_members_and_removal() {
        let mut keyspace = Keyspace::new();
        assert!(keyspace.add_member("s", "1").unwrap());
        assert!(!keyspace.add_member("s", "1").unwrap());
        assert!(keyspace.add_member("s", "2").unwrap());

        let mut members = keyspace.members("s").unwrap();
        members.sort();
        assert_eq!(members, vec!["1".to_string(), "2".to_string()]);

        assert!(keyspace.remove_member("s", "1").unwrap());
        assert!(!keyspace.remove_member("s", "1").unwrap());
        assert!(keyspace.remove_member("s", "2").unwrap());
        assert!(!keyspace.exists("s"));
    }

    #[test]
    fn test_remove_member_from_missing_key() {
        let mut keyspace = Keyspace::new();
        assert!(!keyspace.remove_member("missing", "x").unwrap());
        assert!(keyspace.members("missing").unwrap().is_empty());
    }

    #[test]
    fn test_wrong_type_reads() {
        let mut keyspace = Keyspace::new();
        keyspace.add_member("s", "x").unwrap();
        assert!(keyspace.get("s").is_err());
        assert!(keyspace.get_field("s", "x").is_err());
        assert!(keyspace.set_fields("s", &[("a", "b".to_string())]).is_err());
        assert!(keyspace.delete("s"));
        assert!(keyspace.is_empty());
    }
}
