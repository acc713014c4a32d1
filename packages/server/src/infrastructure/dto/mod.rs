//! Data transfer objects for the WebSocket wire protocol.
//!
//! ## Structure
//!
//! - `websocket`: the JSON intent/event types as they appear on the wire
//! - `conversion`: mapping between DTOs and domain types

pub mod conversion;
pub mod websocket;
