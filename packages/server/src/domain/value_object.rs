//! Value objects shared across the realtime core.
//!
//! Construction validates invariants once, so the rest of the core can
//! pass these types around without re-checking.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a user identifier (characters)
const USER_ID_MAX_LEN: usize = 128;

/// Maximum length of a room identifier (characters)
const ROOM_ID_MAX_LEN: usize = 128;

/// Maximum length of a display name (characters)
const DISPLAY_NAME_MAX_LEN: usize = 128;

/// Maximum length of a message body (characters)
const MESSAGE_CONTENT_MAX_LEN: usize = 4096;

/// Validation failure for a value object constructor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },
}

fn validate(value: &str, field: &'static str, max: usize) -> Result<(), ValueError> {
    if value.is_empty() {
        return Err(ValueError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(ValueError::TooLong { field, max });
    }
    Ok(())
}

/// Opaque identifier of an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate(&value, "user id", USER_ID_MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a chat room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate(&value, "room id", ROOM_ID_MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable name attached to an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate(&value, "display name", DISPLAY_NAME_MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Transport-level connection identifier, unique per live socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh connection identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message identifier assigned by the persistence collaborator.
///
/// Assignment order is the per-room delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate(&value, "message content", MESSAGE_CONTENT_MAX_LEN)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
        }
    }
}

/// Presence state of an identity.
///
/// The in-memory value is a cache; the authoritative copy lives in the
/// persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

/// Unix timestamp in UTC milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_non_empty_value() {
        // given:
        let value = "alice".to_string();

        // when:
        let result = UserId::new(value);

        // then:
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "alice");
    }

    #[test]
    fn test_user_id_rejects_empty_value() {
        // given:
        let value = String::new();

        // when:
        let result = UserId::new(value);

        // then:
        assert_eq!(result, Err(ValueError::Empty("user id")));
    }

    #[test]
    fn test_user_id_rejects_overlong_value() {
        // given:
        let value = "x".repeat(USER_ID_MAX_LEN + 1);

        // when:
        let result = UserId::new(value);

        // then:
        assert!(matches!(result, Err(ValueError::TooLong { .. })));
    }

    #[test]
    fn test_message_content_rejects_empty_body() {
        // given:
        let value = String::new();

        // when:
        let result = MessageContent::new(value);

        // then:
        assert_eq!(result, Err(ValueError::Empty("message content")));
    }

    #[test]
    fn test_message_content_accepts_body_at_maximum_length() {
        // given:
        let value = "a".repeat(MESSAGE_CONTENT_MAX_LEN);

        // when:
        let result = MessageContent::new(value);

        // then:
        assert!(result.is_ok());
    }

    #[test]
    fn test_message_content_rejects_body_over_maximum_length() {
        // given:
        let value = "a".repeat(MESSAGE_CONTENT_MAX_LEN + 1);

        // when:
        let result = MessageContent::new(value);

        // then:
        assert!(matches!(result, Err(ValueError::TooLong { .. })));
    }

    #[test]
    fn test_connection_ids_are_unique() {
        // given:

        // when:
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then:
        assert_ne!(a, b);
    }

    #[test]
    fn test_message_kind_round_trips_through_str() {
        // given:
        let kinds = [MessageKind::Text, MessageKind::Image, MessageKind::File];

        // when / then:
        assert_eq!(kinds[0].as_str(), "text");
        assert_eq!(kinds[1].as_str(), "image");
        assert_eq!(kinds[2].as_str(), "file");
    }

    #[test]
    fn test_presence_status_as_str() {
        // given / when / then:
        assert_eq!(PresenceStatus::Online.as_str(), "online");
        assert_eq!(PresenceStatus::Away.as_str(), "away");
        assert_eq!(PresenceStatus::Offline.as_str(), "offline");
    }
}
