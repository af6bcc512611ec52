//! The review record and its field-map representation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A unique identifier for a review.
///
/// Ids are issued by the store's atomic counter, start at 1, strictly
/// increase and are never reused, even after the review is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub u64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReviewId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Field names of a stored review hash.
pub mod field {
    pub const ID: &str = "id";
    pub const COURSE_ID: &str = "course_id";
    pub const USER_ID: &str = "user_id";
    pub const RATING: &str = "rating";
    pub const COMMENT: &str = "comment";
    pub const CREATED_AT: &str = "created_at";
}

/// A course review.
///
/// `course_id` and `user_id` are index keys and never change after creation.
/// Only `rating` and `comment` are mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub course_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// The review as stored hash fields.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (field::ID, self.id.to_string()),
            (field::COURSE_ID, self.course_id.clone()),
            (field::USER_ID, self.user_id.clone()),
            (field::RATING, self.rating.to_string()),
            (field::COMMENT, self.comment.clone()),
            (
                field::CREATED_AT,
                self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]
    }

    /// Rebuild a review from the hash stored under its key.
    ///
    /// The id comes from the key, not from the `id` field, so a record written
    /// only by an update still resolves to the right id.
    pub fn from_fields(id: ReviewId, fields: &BTreeMap<String, String>) -> Result<Self, RecordError> {
        let require = |name: &'static str| {
            fields
                .get(name)
                .ok_or(RecordError::MissingField(name))
        };

        let course_id = require(field::COURSE_ID)?.clone();
        let user_id = require(field::USER_ID)?.clone();
        let comment = require(field::COMMENT)?.clone();

        let rating_text = require(field::RATING)?;
        let rating = rating_text
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidField {
                name: field::RATING,
                value: rating_text.clone(),
            })?;

        let created_at_text = require(field::CREATED_AT)?;
        let created_at = DateTime::parse_from_rfc3339(created_at_text)
            .map_err(|_| RecordError::InvalidField {
                name: field::CREATED_AT,
                value: created_at_text.clone(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            course_id,
            user_id,
            rating,
            comment,
            created_at,
        })
    }
}

/// Why a stored hash is not a usable review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required field is absent. The hash is a partial record.
    MissingField(&'static str),
    /// A field is present but does not parse.
    InvalidField { name: &'static str, value: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::InvalidField { name, value } => {
                write!(f, "invalid value for field '{name}': '{value}'")
            }
        }
    }
}

impl std::error::Error for RecordError {}
