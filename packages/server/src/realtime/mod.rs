//! Shared in-memory realtime state.
//!
//! These components are the only mutable state shared between connection
//! tasks: the session registry (identity → live connections), the
//! per-connection outbound queues, and the cached room membership index.
//! Each instance is created at startup and injected where needed; there
//! is no ambient global.

pub mod outbound;
pub mod registry;
pub mod rooms;

pub use outbound::{CloseReason, Outbound, OutboundQueue, OutboundReceiver, PushError};
pub use registry::{SessionRegistry, UnregisterOutcome};
pub use rooms::RoomMembershipIndex;
