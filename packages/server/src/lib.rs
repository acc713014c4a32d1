//! Real-time chat delivery and presence core.
//!
//! Accepts persistent WebSocket connections, authenticates them through
//! a token collaborator, tracks which identities are reachable on which
//! connections, routes messages to room participants with per-room
//! ordering and durability-before-visibility, and propagates presence
//! and typing events.

// layers
pub mod domain;
pub mod infrastructure;
pub mod realtime;
pub mod ui;
pub mod usecase;
