//! Domain errors and field-keyed validation results.
//!
//! Validation failures are reported as [`FieldErrors`]: a map from field name
//! to the list of messages for that field. Form-wide messages use the
//! [`FORM_FIELD`] key, matching what the calling forms render above inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key used for messages that are not tied to a single input.
pub const FORM_FIELD: &str = "_form";

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown forecast type: {0}")]
    UnknownForecastType(String),

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown conversation status: {0}")]
    UnknownConversationStatus(String),

    #[error("unsupported transcript version {0}")]
    UnsupportedTranscriptVersion(u32),

    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("invalid leaderboard sort field: {0}")]
    UnknownSortField(String),

    #[error("invalid leaderboard filter: {0}")]
    InvalidFilter(String),
}

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error set holding a single form-wide message.
    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(FORM_FIELD, message);
        errors
    }

    /// Append a message for `field`. Repeated messages are kept once.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.0.entry(field.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Merge every message from `other` into this set.
    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            for message in messages {
                self.add(field.clone(), message);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// True if any message for `field` contains `needle`.
    #[must_use]
    pub fn mentions(&self, field: &str, needle: &str) -> bool {
        self.get(field)
            .is_some_and(|messages| messages.iter().any(|m| m.contains(needle)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Convert into a `Result`, failing when any message was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_groups_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("value", "a");
        errors.add("value", "b");
        errors.add(FORM_FIELD, "c");
        assert_eq!(errors.get("value").unwrap(), ["a", "b"]);
        assert!(errors.mentions(FORM_FIELD, "c"));
    }

    #[test]
    fn duplicate_messages_kept_once() {
        let mut errors = FieldErrors::new();
        errors.add("title", "Title is required");
        errors.add("title", "Title is required");
        assert_eq!(errors.get("title").unwrap().len(), 1);
    }

    #[test]
    fn serializes_as_field_map() {
        let errors = FieldErrors::form("Forecast not found");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["_form"][0], "Forecast not found");
    }

    #[test]
    fn into_result_is_ok_when_empty() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::form("x").into_result().is_err());
    }

    #[test]
    fn extend_merges_fields() {
        let mut left = FieldErrors::form("a");
        let mut right = FieldErrors::form("b");
        right.add("title", "c");
        left.extend(right);
        assert_eq!(left.get(FORM_FIELD).unwrap().len(), 2);
        assert_eq!(left.get("title").unwrap(), ["c"]);
    }
}
