//! JSON wire types exchanged over a WebSocket connection.
//!
//! Intents flow client → server, events server → client. Both are
//! internally tagged so that every frame is self-describing:
//!
//! ```json
//! {"type":"send_message","room_id":"r1","content":"hi","kind":"text"}
//! {"type":"new_message","message":{"id":42,...}}
//! ```

use serde::{Deserialize, Serialize};

/// Message payload kind on the wire; defaults to `text` when omitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKindDto {
    #[default]
    Text,
    Image,
    File,
}

/// Inbound intent accepted from a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    Authenticate {
        token: String,
    },
    JoinRoom {
        room_id: String,
    },
    LeaveRoom {
        room_id: String,
    },
    SendMessage {
        room_id: String,
        content: String,
        #[serde(default)]
        kind: MessageKindDto,
        #[serde(default)]
        reply_to: Option<u64>,
    },
    StartTyping {
        room_id: String,
    },
    StopTyping {
        room_id: String,
    },
}

/// A persisted message as delivered to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: u64,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKindDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
    /// Unix timestamp in UTC milliseconds
    pub created_at: i64,
}

/// Outbound event sent to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEventDto {
    Authenticated {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    NewMessage {
        message: MessageDto,
    },
    PresenceChanged {
        user_id: String,
        status: String,
    },
    TypingStarted {
        user_id: String,
        room_id: String,
    },
    TypingStopped {
        user_id: String,
        room_id: String,
    },
    Error {
        kind: String,
        message: String,
    },
}
