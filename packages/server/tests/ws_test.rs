//! Integration tests driving the server over real WebSocket connections.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use relay_server::{
    domain::{AuthenticatedUser, ChatStore, DisplayName, RoomId, UserId},
    infrastructure::{InMemoryChatStore, StaticTokenVerifier},
    realtime::{RoomMembershipIndex, SessionRegistry},
    ui::{AppState, ServerConfig, app},
    usecase::{
        AuthenticateConnectionUseCase, DisconnectConnectionUseCase, MessageRouter, PresenceTracker,
        SubscribeRoomUseCase, TypingTracker,
    },
};
use relay_shared::time::{Clock, SystemClock};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn user_id(name: &str) -> UserId {
    UserId::new(name.to_string()).unwrap()
}

/// Start a server on a random port.
///
/// Seeds users alice and bob sharing room "lobby", plus mallory who
/// participates in no room. Tokens are `<name>-token`.
async fn start_test_server() -> SocketAddr {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryChatStore::new(clock.clone()));
    let mut verifier = StaticTokenVerifier::new();
    for name in ["alice", "bob", "mallory"] {
        let user = AuthenticatedUser {
            user_id: user_id(name),
            display_name: DisplayName::new(name.to_string()).unwrap(),
        };
        store
            .add_user(user.user_id.clone(), user.display_name.clone())
            .await;
        verifier.insert(format!("{name}-token"), user);
    }
    store
        .add_room(
            RoomId::new("lobby".to_string()).unwrap(),
            HashSet::from([user_id("alice"), user_id("bob")]),
        )
        .await;
    let store: Arc<dyn ChatStore> = store;

    let registry = Arc::new(SessionRegistry::new());
    let rooms = Arc::new(RoomMembershipIndex::new(store.clone(), registry.clone()));
    let presence_tracker = Arc::new(PresenceTracker::new(
        store.clone(),
        rooms.clone(),
        registry.clone(),
        clock,
    ));
    let typing_tracker = Arc::new(TypingTracker::new(rooms.clone(), registry.clone()));
    let state = AppState {
        authenticate_usecase: Arc::new(AuthenticateConnectionUseCase::new(
            Arc::new(verifier),
            registry.clone(),
            presence_tracker.clone(),
        )),
        disconnect_usecase: Arc::new(DisconnectConnectionUseCase::new(
            registry.clone(),
            presence_tracker.clone(),
            typing_tracker.clone(),
        )),
        subscribe_usecase: Arc::new(SubscribeRoomUseCase::new(rooms.clone())),
        message_router: MessageRouter::new(store, rooms.clone(), registry.clone()),
        presence_tracker,
        typing_tracker,
        registry,
        rooms,
        config: ServerConfig::default(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(Arc::new(state))).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("failed to connect");
    ws
}

async fn send_intent(ws: &mut WsClient, intent: Value) {
    ws.send(Message::Text(intent.to_string().into()))
        .await
        .expect("failed to send intent");
}

/// Receive events until one with the given `type` tag arrives, skipping
/// unrelated events (e.g. presence updates racing a message test)
async fn recv_event(ws: &mut WsClient, event_type: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            let event: Value = serde_json::from_str(&text).expect("event is not valid JSON");
            if event["type"] == event_type {
                return event;
            }
        }
    }
}

/// Receive the next event, whatever it is
async fn recv_next(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("event is not valid JSON");
        }
    }
}

async fn authenticate(ws: &mut WsClient, token: &str) {
    send_intent(ws, json!({"type": "authenticate", "token": token})).await;
    let event = recv_event(ws, "authenticated").await;
    assert_eq!(event["success"], true, "authentication failed: {event}");
}

#[tokio::test]
async fn test_health_endpoint() {
    // given:
    let addr = start_test_server().await;

    // when:
    let response = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();

    // then:
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_authentication_success() {
    // given:
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    // when:
    send_intent(&mut ws, json!({"type": "authenticate", "token": "alice-token"})).await;

    // then:
    let event = recv_event(&mut ws, "authenticated").await;
    assert_eq!(event["success"], true);
}

#[tokio::test]
async fn test_failed_authentication_allows_retry() {
    // given:
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    // when: a bad token is presented first
    send_intent(&mut ws, json!({"type": "authenticate", "token": "bogus"})).await;

    // then: the failure is reported and the connection stays open
    let event = recv_event(&mut ws, "authenticated").await;
    assert_eq!(event["success"], false);
    assert!(event["error"].is_string());

    // when: a valid token follows on the same connection
    send_intent(&mut ws, json!({"type": "authenticate", "token": "alice-token"})).await;

    // then:
    let event = recv_event(&mut ws, "authenticated").await;
    assert_eq!(event["success"], true);
}

#[tokio::test]
async fn test_intent_before_authentication_is_rejected() {
    // given:
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    // when:
    send_intent(
        &mut ws,
        json!({"type": "send_message", "room_id": "lobby", "content": "hi"}),
    )
    .await;

    // then:
    let event = recv_event(&mut ws, "error").await;
    assert_eq!(event["kind"], "not_authenticated");
}

#[tokio::test]
async fn test_malformed_frame_reports_invalid_message() {
    // given:
    let addr = start_test_server().await;
    let mut ws = connect(addr).await;

    // when:
    ws.send(Message::Text("not json at all".into())).await.unwrap();

    // then: the connection survives and reports the malformed intent
    let event = recv_event(&mut ws, "error").await;
    assert_eq!(event["kind"], "invalid_message");
}

#[tokio::test]
async fn test_message_reaches_peer_and_echoes_to_sender() {
    // given: alice and bob authenticated
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;
    authenticate(&mut bob, "bob-token").await;

    // when:
    send_intent(
        &mut alice,
        json!({"type": "send_message", "room_id": "lobby", "content": "hi"}),
    )
    .await;

    // then: bob receives the message
    let event = recv_event(&mut bob, "new_message").await;
    assert_eq!(event["message"]["content"], "hi");
    assert_eq!(event["message"]["sender_id"], "alice");
    let delivered_id = event["message"]["id"].as_u64().unwrap();

    // and alice receives the echo with the same assigned id
    let echo = recv_event(&mut alice, "new_message").await;
    assert_eq!(echo["message"]["id"].as_u64().unwrap(), delivered_id);
}

#[tokio::test]
async fn test_non_participant_send_is_forbidden() {
    // given: mallory is authenticated but not in the lobby
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut mallory = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;
    authenticate(&mut mallory, "mallory-token").await;

    // when:
    send_intent(
        &mut mallory,
        json!({"type": "send_message", "room_id": "lobby", "content": "let me in"}),
    )
    .await;

    // then: mallory gets a forbidden error
    let event = recv_event(&mut mallory, "error").await;
    assert_eq!(event["kind"], "forbidden");

    // and the next message alice observes in the lobby is her own, not
    // mallory's
    send_intent(
        &mut alice,
        json!({"type": "send_message", "room_id": "lobby", "content": "all clear"}),
    )
    .await;
    let event = recv_event(&mut alice, "new_message").await;
    assert_eq!(event["message"]["content"], "all clear");
}

#[tokio::test]
async fn test_join_of_foreign_room_is_forbidden() {
    // given:
    let addr = start_test_server().await;
    let mut mallory = connect(addr).await;
    authenticate(&mut mallory, "mallory-token").await;

    // when:
    send_intent(&mut mallory, json!({"type": "join_room", "room_id": "lobby"})).await;

    // then:
    let event = recv_event(&mut mallory, "error").await;
    assert_eq!(event["kind"], "forbidden");
}

#[tokio::test]
async fn test_per_room_delivery_order_is_preserved() {
    // given:
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;
    authenticate(&mut bob, "bob-token").await;

    // when: alice sends a rapid burst
    for i in 0..10 {
        send_intent(
            &mut alice,
            json!({"type": "send_message", "room_id": "lobby", "content": format!("msg-{i}")}),
        )
        .await;
    }

    // then: bob observes ids in strictly increasing assignment order
    let mut last_id = 0;
    for _ in 0..10 {
        let event = recv_event(&mut bob, "new_message").await;
        let id = event["message"]["id"].as_u64().unwrap();
        assert!(id > last_id, "out-of-order delivery: {id} after {last_id}");
        last_id = id;
    }
}

#[tokio::test]
async fn test_presence_propagates_to_room_peers() {
    // given: alice online first
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;

    // when: bob comes online
    let mut bob = connect(addr).await;
    authenticate(&mut bob, "bob-token").await;

    // then: alice sees bob go online
    let event = recv_event(&mut alice, "presence_changed").await;
    assert_eq!(event["user_id"], "bob");
    assert_eq!(event["status"], "online");

    // when: bob disconnects
    drop(bob);

    // then: alice sees bob go offline
    let event = recv_event(&mut alice, "presence_changed").await;
    assert_eq!(event["user_id"], "bob");
    assert_eq!(event["status"], "offline");
}

#[tokio::test]
async fn test_typing_indicator_round_trip() {
    // given:
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;
    authenticate(&mut bob, "bob-token").await;

    // when: alice starts typing
    send_intent(&mut alice, json!({"type": "start_typing", "room_id": "lobby"})).await;

    // then: bob sees the indicator
    let event = recv_event(&mut bob, "typing_started").await;
    assert_eq!(event["user_id"], "alice");
    assert_eq!(event["room_id"], "lobby");

    // when: alice's message lands
    send_intent(
        &mut alice,
        json!({"type": "send_message", "room_id": "lobby", "content": "done typing"}),
    )
    .await;

    // then: the indicator clears without an explicit stop
    let event = recv_event(&mut bob, "typing_stopped").await;
    assert_eq!(event["user_id"], "alice");
}

#[tokio::test]
async fn test_disconnect_clears_typing_indicator() {
    // given: bob typing in the lobby
    let addr = start_test_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    authenticate(&mut alice, "alice-token").await;
    authenticate(&mut bob, "bob-token").await;
    send_intent(&mut bob, json!({"type": "start_typing", "room_id": "lobby"})).await;
    let event = recv_event(&mut alice, "typing_started").await;
    assert_eq!(event["user_id"], "bob");

    // when: bob's transport drops mid-typing
    drop(bob);

    // then: alice sees the indicator clear
    let event = recv_event(&mut alice, "typing_stopped").await;
    assert_eq!(event["user_id"], "bob");
}

#[tokio::test]
async fn test_multi_device_presence_fires_offline_once() {
    // given: alice on two devices, bob watching
    let addr = start_test_server().await;
    let mut bob = connect(addr).await;
    authenticate(&mut bob, "bob-token").await;
    let mut alice_phone = connect(addr).await;
    let mut alice_laptop = connect(addr).await;
    authenticate(&mut alice_phone, "alice-token").await;
    authenticate(&mut alice_laptop, "alice-token").await;
    let event = recv_event(&mut bob, "presence_changed").await;
    assert_eq!(event["user_id"], "alice");
    assert_eq!(event["status"], "online");

    // when: the first device disconnects
    drop(alice_phone);

    // and alice sends from the remaining device, proving she is still
    // routable
    send_intent(
        &mut alice_laptop,
        json!({"type": "send_message", "room_id": "lobby", "content": "still here"}),
    )
    .await;

    // then: bob's very next event is the message; no offline
    // transition fired for the non-last device
    let event = recv_next(&mut bob).await;
    assert_eq!(event["type"], "new_message");
    assert_eq!(event["message"]["content"], "still here");

    // when: the last device disconnects
    drop(alice_laptop);

    // then: the offline transition fires exactly now
    let event = recv_event(&mut bob, "presence_changed").await;
    assert_eq!(event["user_id"], "alice");
    assert_eq!(event["status"], "offline");
}
