//! Shared utilities for the relay chat server.
//!
//! Cross-cutting concerns used by the server binary and its tests:
//! logging setup and time handling.

pub mod logger;
pub mod time;
