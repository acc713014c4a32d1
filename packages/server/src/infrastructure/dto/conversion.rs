//! Conversion logic between wire DTOs and domain types.

use crate::domain::{MessageEnvelope, MessageKind, ServerEvent};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// DTO → Domain
// ========================================

impl From<dto::MessageKindDto> for MessageKind {
    fn from(kind: dto::MessageKindDto) -> Self {
        match kind {
            dto::MessageKindDto::Text => Self::Text,
            dto::MessageKindDto::Image => Self::Image,
            dto::MessageKindDto::File => Self::File,
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<MessageKind> for dto::MessageKindDto {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => Self::Text,
            MessageKind::Image => Self::Image,
            MessageKind::File => Self::File,
        }
    }
}

impl From<MessageEnvelope> for dto::MessageDto {
    fn from(envelope: MessageEnvelope) -> Self {
        Self {
            id: envelope.id.value(),
            room_id: envelope.room_id.into_string(),
            sender_id: envelope.sender.into_string(),
            sender_name: envelope.sender_name.into_string(),
            content: envelope.content.into_string(),
            kind: envelope.kind.into(),
            reply_to: envelope.reply_to.map(|id| id.value()),
            created_at: envelope.created_at.value(),
        }
    }
}

impl From<ServerEvent> for dto::ServerEventDto {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::Authenticated { success, error } => Self::Authenticated { success, error },
            ServerEvent::NewMessage { envelope } => Self::NewMessage {
                message: envelope.into(),
            },
            ServerEvent::PresenceChanged { user_id, status } => Self::PresenceChanged {
                user_id: user_id.into_string(),
                status: status.as_str().to_string(),
            },
            ServerEvent::TypingStarted { user_id, room_id } => Self::TypingStarted {
                user_id: user_id.into_string(),
                room_id: room_id.into_string(),
            },
            ServerEvent::TypingStopped { user_id, room_id } => Self::TypingStopped {
                user_id: user_id.into_string(),
                room_id: room_id.into_string(),
            },
            ServerEvent::Error { kind, message } => Self::Error {
                kind: kind.as_str().to_string(),
                message,
            },
        }
    }
}
