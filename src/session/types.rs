use crate::utils::text::truncate_with_marker;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default ingestion limit for message content, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Suffix appended to content cut at ingestion.
pub const TRUNCATION_MARKER: &str = " [...truncated...]";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Capitalized label used in transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One entry of a session log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Opaque reference to an externally stored attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            image_ref: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// `"<Role>: <content>\n"`
    pub fn transcript_line(&self) -> String {
        format!("{}: {}\n", self.role.label(), self.content)
    }

    pub(crate) fn truncated(mut self, max_chars: usize) -> Self {
        if self.content.chars().nth(max_chars).is_some() {
            self.content = truncate_with_marker(&self.content, max_chars, TRUNCATION_MARKER);
        }
        self
    }
}

/// An isolated conversation. `messages` is in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_updated: now,
            messages: Vec::new(),
        }
    }

    /// Last `limit` messages, or all of them when `limit` is `None`.
    pub fn tail(&self, limit: Option<usize>) -> &[Message] {
        match limit {
            Some(limit) => {
                let start = self.messages.len().saturating_sub(limit);
                &self.messages[start..]
            }
            None => &self.messages,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            created_at: self.created_at,
            last_updated: self.last_updated,
            message_count: self.messages.len(),
        }
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub(crate) fn clear_messages(&mut self) {
        self.messages.clear();
        self.touch();
    }

    // last_updated never moves backwards, even if the wall clock does.
    fn touch(&mut self) {
        self.last_updated = self.last_updated.max(Utc::now());
    }
}

/// Metadata returned by `list_sessions`; carries no messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub message_count: usize,
}

/// Parse an ISO-8601 timestamp into UTC. Values without an offset are taken
/// as UTC already.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
}
