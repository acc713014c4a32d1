//! UseCase layer: the operations the connection handler orchestrates.

pub mod authenticate;
pub mod disconnect;
pub mod error;
pub mod presence;
pub mod submit_message;
pub mod subscribe;
pub mod typing;

pub use authenticate::AuthenticateConnectionUseCase;
pub use disconnect::DisconnectConnectionUseCase;
pub use error::{AuthenticateError, SubmitError, SubscribeError, TypingError};
pub use presence::PresenceTracker;
pub use submit_message::MessageRouter;
pub use subscribe::SubscribeRoomUseCase;
pub use typing::TypingTracker;
