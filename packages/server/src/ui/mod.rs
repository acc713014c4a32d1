//! UI layer: the axum server, its shared state, and the WebSocket and
//! HTTP handlers.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::{Server, app};
pub use state::{AppState, ServerConfig};
