//! Real-time chat server binary.
//!
//! Wires the in-memory collaborator implementations to the realtime
//! core and seeds a demo room. Production deployments supply their own
//! `ChatStore` and `TokenVerifier` implementations instead.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin relay-server
//! cargo run --bin relay-server -- --host 0.0.0.0 --port 3000
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use relay_server::{
    domain::{AuthenticatedUser, ChatStore, DisplayName, RoomId, UserId},
    infrastructure::{InMemoryChatStore, StaticTokenVerifier},
    realtime::{RoomMembershipIndex, SessionRegistry},
    ui::{AppState, Server, ServerConfig},
    usecase::{
        AuthenticateConnectionUseCase, DisconnectConnectionUseCase, MessageRouter, PresenceTracker,
        SubscribeRoomUseCase, TypingTracker,
    },
};
use relay_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "Real-time chat delivery and presence server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Bound of each connection's outbound event queue
    #[arg(long, default_value_t = 256)]
    outbound_capacity: usize,

    /// Seconds an anonymous connection may stay unauthenticated
    #[arg(long, default_value_t = 30)]
    auth_timeout_secs: u64,
}

/// Demo identities with fixed tokens, all sharing one room
const DEMO_USERS: [(&str, &str, &str); 2] = [
    ("alice", "Alice", "alice-token"),
    ("bob", "Bob", "bob-token"),
];

const DEMO_ROOM: &str = "lobby";

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Collaborators (store, token verifier)
    // 2. Shared realtime state (registry, membership index)
    // 3. UseCases
    // 4. AppState / Server

    // 1. Collaborators, seeded with demo data
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryChatStore::new(clock.clone()));
    let mut verifier = StaticTokenVerifier::new();
    let mut participants = HashSet::new();
    for (user_id, display_name, token) in DEMO_USERS {
        let user = AuthenticatedUser {
            user_id: UserId::new(user_id.to_string()).expect("demo user id is valid"),
            display_name: DisplayName::new(display_name.to_string())
                .expect("demo display name is valid"),
        };
        store
            .add_user(user.user_id.clone(), user.display_name.clone())
            .await;
        participants.insert(user.user_id.clone());
        verifier.insert(token, user);
        tracing::info!("demo user '{}' accepts token '{}'", user_id, token);
    }
    let room_id = RoomId::new(DEMO_ROOM.to_string()).expect("demo room id is valid");
    store.add_room(room_id.clone(), participants).await;
    tracing::info!("demo room '{}' created", room_id);
    let store: Arc<dyn ChatStore> = store;

    // 2. Shared realtime state
    let registry = Arc::new(SessionRegistry::new());
    let rooms = Arc::new(RoomMembershipIndex::new(store.clone(), registry.clone()));

    // 3. UseCases
    let presence_tracker = Arc::new(PresenceTracker::new(
        store.clone(),
        rooms.clone(),
        registry.clone(),
        clock,
    ));
    let typing_tracker = Arc::new(TypingTracker::new(rooms.clone(), registry.clone()));
    let message_router = MessageRouter::new(store, rooms.clone(), registry.clone());
    let authenticate_usecase = Arc::new(AuthenticateConnectionUseCase::new(
        Arc::new(verifier),
        registry.clone(),
        presence_tracker.clone(),
    ));
    let disconnect_usecase = Arc::new(DisconnectConnectionUseCase::new(
        registry.clone(),
        presence_tracker.clone(),
        typing_tracker.clone(),
    ));
    let subscribe_usecase = Arc::new(SubscribeRoomUseCase::new(rooms.clone()));

    // 4. Create and run the server
    let state = AppState {
        authenticate_usecase,
        disconnect_usecase,
        subscribe_usecase,
        message_router,
        presence_tracker,
        typing_tracker,
        registry,
        rooms,
        config: ServerConfig {
            outbound_capacity: args.outbound_capacity,
            auth_timeout: Duration::from_secs(args.auth_timeout_secs),
        },
    };
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
