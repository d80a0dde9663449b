//! AI forecast-authoring conversations and their transcripts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{ConversationId, ForecastId, OrganizationId, UserId};

/// Transcript schema version written by this crate.
pub const TRANSCRIPT_VERSION: u32 = 1;

/// Longest conversation title kept verbatim.
const TITLE_MAX_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl ConversationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "ABANDONED" => Ok(Self::Abandoned),
            other => Err(DomainError::UnknownConversationStatus(other.to_string())),
        }
    }
}

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered chat history persisted with a conversation.
///
/// Stored as `{"version": 1, "messages": [...]}`. Loading rejects unknown
/// versions and empty message content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

#[derive(Serialize, Deserialize)]
struct StoredTranscript {
    version: u32,
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTranscript`] for blank content.
    pub fn push(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::InvalidTranscript(format!(
                "{} message has no content",
                role.as_str()
            )));
        }
        self.messages.push(TranscriptMessage {
            role,
            content,
            timestamp,
        });
        Ok(())
    }

    #[must_use]
    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(&StoredTranscript {
            version: TRANSCRIPT_VERSION,
            messages: self.messages.clone(),
        })
        .map_err(|e| DomainError::InvalidTranscript(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let stored: StoredTranscript =
            serde_json::from_str(raw).map_err(|e| DomainError::InvalidTranscript(e.to_string()))?;
        if stored.version != TRANSCRIPT_VERSION {
            return Err(DomainError::UnsupportedTranscriptVersion(stored.version));
        }
        let mut transcript = Self::new();
        for message in stored.messages {
            transcript.push(message.role, message.content, message.timestamp)?;
        }
        Ok(transcript)
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub title: String,
    #[serde(skip)]
    pub transcript: Transcript,
    pub token_count: i64,
    pub status: ConversationStatus,
    pub forecast_id: Option<ForecastId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId, organization: &OrganizationId) -> bool {
        &self.user_id == user && &self.organization_id == organization
    }
}

/// Title derived from the first user message.
#[must_use]
pub fn conversation_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(TITLE_MAX_CHARS - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_kept() {
        assert_eq!(conversation_title("  Forecast Q3 sales  "), "Forecast Q3 sales");
    }

    #[test]
    fn long_titles_truncated_to_sixty() {
        let title = conversation_title(&"a".repeat(80));
        assert_eq!(title.chars().count(), 60);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn transcript_round_trips_with_version() {
        let mut transcript = Transcript::new();
        transcript.push(MessageRole::User, "hello", Utc::now()).unwrap();
        transcript
            .push(MessageRole::Assistant, "hi there", Utc::now())
            .unwrap();
        let json = transcript.to_json().unwrap();
        assert!(json.starts_with(r#"{"version":1"#));
        assert_eq!(Transcript::from_json(&json).unwrap(), transcript);
    }

    #[test]
    fn unknown_version_rejected() {
        let err = Transcript::from_json(r#"{"version":2,"messages":[]}"#).unwrap_err();
        assert_eq!(err, DomainError::UnsupportedTranscriptVersion(2));
    }

    #[test]
    fn blank_content_rejected_on_load() {
        let raw = r#"{"version":1,"messages":[{"role":"user","content":" ","timestamp":"2026-01-01T00:00:00Z"}]}"#;
        assert!(matches!(
            Transcript::from_json(raw),
            Err(DomainError::InvalidTranscript(_))
        ));
    }

    #[test]
    fn unknown_role_rejected_on_load() {
        let raw = r#"{"version":1,"messages":[{"role":"tool","content":"x","timestamp":"2026-01-01T00:00:00Z"}]}"#;
        assert!(Transcript::from_json(raw).is_err());
    }

    #[test]
    fn status_parses_stored_form() {
        assert_eq!(
            "ABANDONED".parse::<ConversationStatus>().unwrap(),
            ConversationStatus::Abandoned
        );
        assert!("DONE".parse::<ConversationStatus>().is_err());
    }
}
