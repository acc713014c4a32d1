//! WebSocket connection handler.
//!
//! One connection, two tasks: a reader that parses inbound intents and
//! drives the usecases, and a writer that drains the connection's
//! outbound queue onto the socket. The per-connection state machine is
//! `anonymous → authenticated`; a failed authentication leaves the
//! connection open for a retry, but an anonymous connection that blows
//! its deadline is closed.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::domain::{
    AuthenticatedUser, ConnectionId, ErrorKind, MessageContent, MessageId, RoomId, ServerEvent,
};
use crate::infrastructure::dto::websocket::{ClientIntent, ServerEventDto};
use crate::realtime::outbound::{
    CloseReason, Outbound, OutboundQueue, OutboundReceiver, outbound_channel,
};
use crate::ui::state::AppState;
use crate::usecase::AuthenticateError;

/// WebSocket close code for a consumer that fell too far behind
const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Per-connection state owned by the reader task
struct ConnectionState {
    user: Option<AuthenticatedUser>,
    joined: HashSet<RoomId>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionId::generate();
    let (queue, rx) = outbound_channel(state.config.outbound_capacity);
    let (sender, receiver) = socket.split();

    tracing::info!(connection_id = %connection_id, "connection established");

    let mut send_task = tokio::spawn(pusher_loop(rx, sender));
    let mut recv_task = tokio::spawn(read_loop(receiver, state.clone(), connection_id, queue));

    // If either task completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Teardown runs on every exit path, including slow-consumer closes
    state.disconnect_usecase.execute(connection_id).await;
    tracing::info!(connection_id = %connection_id, "connection closed");
}

/// Writer task: drains the outbound queue onto the WebSocket sink.
///
/// A `Closed` item means the connection is being torn down server-side
/// (slow consumer); the client gets a close frame instead of the backlog.
async fn pusher_loop(mut rx: OutboundReceiver, mut sender: SplitSink<WebSocket, Message>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Event(event) => {
                let dto = ServerEventDto::from(event);
                let json = serde_json::to_string(&dto).unwrap();
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Closed(CloseReason::SlowConsumer) => {
                let _ = sender
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_POLICY_VIOLATION,
                        reason: "slow consumer".into(),
                    })))
                    .await;
                break;
            }
        }
    }
}

/// Reader task: parses inbound frames and dispatches intents
async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    queue: OutboundQueue,
) {
    let mut conn = ConnectionState {
        user: None,
        joined: HashSet::new(),
    };
    let auth_deadline = tokio::time::Instant::now() + state.config.auth_timeout;

    loop {
        // An anonymous connection only gets a bounded wait
        let msg = if conn.user.is_none() {
            match tokio::time::timeout_at(auth_deadline, receiver.next()).await {
                Ok(msg) => msg,
                Err(_) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        "authentication deadline expired, closing anonymous connection"
                    );
                    break;
                }
            }
        } else {
            receiver.next().await
        };

        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => {
                let intent = match serde_json::from_str::<ClientIntent>(&text) {
                    Ok(intent) => intent,
                    Err(e) => {
                        tracing::debug!(
                            connection_id = %connection_id,
                            error = %e,
                            "malformed intent"
                        );
                        let _ = queue
                            .push(ServerEvent::Error {
                                kind: ErrorKind::InvalidMessage,
                                message: "malformed intent".to_string(),
                            })
                            .await;
                        continue;
                    }
                };
                handle_intent(&state, connection_id, &queue, &mut conn, intent).await;
            }
            Message::Ping(_) => {
                // Ping/pong is handled by the protocol layer
            }
            Message::Close(_) => {
                tracing::info!(connection_id = %connection_id, "client requested close");
                break;
            }
            _ => {}
        }
    }

    tracing::debug!(
        connection_id = %connection_id,
        joined_rooms = conn.joined.len(),
        "reader loop ended"
    );
}

async fn handle_intent(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    queue: &OutboundQueue,
    conn: &mut ConnectionState,
    intent: ClientIntent,
) {
    match intent {
        ClientIntent::Authenticate { token } => {
            if conn.user.is_some() {
                let _ = queue
                    .push(ServerEvent::Error {
                        kind: ErrorKind::InvalidMessage,
                        message: "connection is already authenticated".to_string(),
                    })
                    .await;
                return;
            }
            match state
                .authenticate_usecase
                .execute(connection_id, &token, queue.clone())
                .await
            {
                Ok(user) => {
                    conn.user = Some(user);
                    let _ = queue
                        .push(ServerEvent::Authenticated {
                            success: true,
                            error: None,
                        })
                        .await;
                }
                Err(AuthenticateError::InvalidToken) => {
                    // Recoverable: the connection stays anonymous and
                    // the client may present another token
                    let _ = queue
                        .push(ServerEvent::Authenticated {
                            success: false,
                            error: Some("invalid or expired token".to_string()),
                        })
                        .await;
                }
                Err(e @ AuthenticateError::Registry(_)) => {
                    let _ = queue
                        .push(ServerEvent::Error {
                            kind: ErrorKind::AuthenticationFailure,
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
        intent => {
            let Some(user) = conn.user.clone() else {
                let _ = queue
                    .push(ServerEvent::Error {
                        kind: ErrorKind::NotAuthenticated,
                        message: "authenticate before sending intents".to_string(),
                    })
                    .await;
                return;
            };
            // Any authenticated activity counts against idle state
            state.presence_tracker.mark_active(&user.user_id).await;
            handle_authenticated_intent(state, connection_id, queue, conn, &user, intent).await;
        }
    }
}

async fn handle_authenticated_intent(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    queue: &OutboundQueue,
    conn: &mut ConnectionState,
    user: &AuthenticatedUser,
    intent: ClientIntent,
) {
    match intent {
        ClientIntent::Authenticate { .. } => {
            // Dispatched before reaching here
        }
        ClientIntent::JoinRoom { room_id } => {
            let Some(room_id) = parse_room_id(queue, room_id).await else {
                return;
            };
            match state.subscribe_usecase.join(&user.user_id, &room_id).await {
                Ok(()) => {
                    conn.joined.insert(room_id);
                }
                Err(e) => {
                    let _ = queue
                        .push(ServerEvent::Error {
                            kind: e.kind(),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
        ClientIntent::LeaveRoom { room_id } => {
            let Some(room_id) = parse_room_id(queue, room_id).await else {
                return;
            };
            conn.joined.remove(&room_id);
            state.subscribe_usecase.leave(&user.user_id, &room_id);
        }
        ClientIntent::SendMessage {
            room_id,
            content,
            kind,
            reply_to,
        } => {
            let Some(room_id) = parse_room_id(queue, room_id).await else {
                return;
            };
            let content = match MessageContent::new(content) {
                Ok(content) => content,
                Err(e) => {
                    let _ = queue
                        .push(ServerEvent::Error {
                            kind: ErrorKind::InvalidMessage,
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };
            let result = state
                .message_router
                .submit(
                    user.user_id.clone(),
                    room_id.clone(),
                    content,
                    kind.into(),
                    reply_to.map(MessageId::new),
                )
                .await;
            match result {
                Ok(_envelope) => {
                    // The sender's acknowledgement is the echoed
                    // NewMessage event; sending also clears any typing
                    // indicator this connection had in the room
                    state.typing_tracker.stop(connection_id, &room_id).await;
                }
                Err(e) => {
                    let _ = queue
                        .push(ServerEvent::Error {
                            kind: e.kind(),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
        ClientIntent::StartTyping { room_id } => {
            let Some(room_id) = parse_room_id(queue, room_id).await else {
                return;
            };
            if let Err(e) = state
                .typing_tracker
                .start(connection_id, &user.user_id, &room_id)
                .await
            {
                let _ = queue
                    .push(ServerEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .await;
            }
        }
        ClientIntent::StopTyping { room_id } => {
            let Some(room_id) = parse_room_id(queue, room_id).await else {
                return;
            };
            state.typing_tracker.stop(connection_id, &room_id).await;
        }
    }
}

/// Convert a raw room id, reporting `InvalidMessage` on the connection
/// when it fails validation
async fn parse_room_id(queue: &OutboundQueue, raw: String) -> Option<RoomId> {
    match RoomId::new(raw) {
        Ok(room_id) => Some(room_id),
        Err(e) => {
            let _ = queue
                .push(ServerEvent::Error {
                    kind: ErrorKind::InvalidMessage,
                    message: e.to_string(),
                })
                .await;
            None
        }
    }
}
