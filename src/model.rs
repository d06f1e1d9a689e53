use crate::error::{NarratorError, SessionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Opaque, caller-supplied identifier for one player's story.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Wraps a caller-supplied key. The only requirement is that it is non-empty.
    pub fn parse(raw: impl Into<String>) -> SessionResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(NarratorError::EmptyKey);
        }
        Ok(Self(raw))
    }

    /// Mints a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrows the underlying key as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = NarratorError;

    fn try_from(value: String) -> SessionResult<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for SessionKey {
    type Error = NarratorError;

    fn try_from(value: &str) -> SessionResult<Self> {
        Self::parse(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation. The ordered sequence is the prompt for the next turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One decoded narrative step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Turn {
    pub plot: String,
    pub choices: Vec<String>,
    /// Continuity notes for the model; never shown to the player.
    pub hidden: String,
}

impl Turn {
    /// A turn offering no choices ends the story.
    pub fn is_ending(&self) -> bool {
        self.choices.is_empty()
    }

    /// Exact string match against the offered choices.
    pub fn offers(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }

    /// Player-facing projection with the hidden notes stripped.
    pub fn view(&self) -> StoryView {
        StoryView {
            plot: self.plot.clone(),
            choices: self.choices.clone(),
        }
    }
}

/// What the player sees of a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct StoryView {
    pub plot: String,
    pub choices: Vec<String>,
}

impl From<Turn> for StoryView {
    fn from(turn: Turn) -> Self {
        Self {
            plot: turn.plot,
            choices: turn.choices,
        }
    }
}

/// A live conversation as held by the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub key: SessionKey,
    pub messages: Vec<Message>,
    pub last_touched_at: OffsetDateTime,
}

impl ConversationRecord {
    pub fn new(key: SessionKey, messages: Vec<Message>, now: OffsetDateTime) -> Self {
        Self {
            key,
            messages,
            last_touched_at: now,
        }
    }

    /// Resets the sliding expiry window.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.last_touched_at = now;
    }

    /// A zero TTL never expires, and neither does one reaching past the calendar range.
    pub fn is_expired(&self, ttl: Duration, now: OffsetDateTime) -> bool {
        if ttl.is_zero() {
            return false;
        }
        match self.last_touched_at.checked_add(ttl) {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(SessionKey::parse(""), Err(NarratorError::EmptyKey)));
        assert_eq!(SessionKey::parse("p1").expect("key").as_str(), "p1");
    }

    #[test]
    fn deserialized_keys_are_validated() {
        let key: SessionKey = serde_json::from_str(r#""p1""#).expect("key");
        assert_eq!(key.as_str(), "p1");
        assert!(serde_json::from_str::<SessionKey>(r#""""#).is_err());
        assert_eq!(serde_json::to_string(&key).expect("serialize"), r#""p1""#);
    }

    #[test]
    fn huge_ttl_never_expires() {
        let now = OffsetDateTime::now_utc();
        let key = SessionKey::parse("k").expect("key");
        let record = ConversationRecord::new(key, vec![], now);
        assert!(!record.is_expired(Duration::MAX, now + Duration::days(365)));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(SessionKey::generate(), SessionKey::generate());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).expect("serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn expiry_is_inclusive_and_zero_ttl_never_expires() {
        let now = OffsetDateTime::now_utc();
        let key = SessionKey::parse("k").expect("key");
        let record = ConversationRecord::new(key, vec![], now);
        let ttl = Duration::seconds(10);
        assert!(!record.is_expired(ttl, now + Duration::seconds(9)));
        assert!(record.is_expired(ttl, now + Duration::seconds(10)));
        assert!(!record.is_expired(Duration::ZERO, now + Duration::days(365)));
    }
}
