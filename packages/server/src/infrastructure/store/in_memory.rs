//! In-memory ChatStore implementation.
//!
//! HashMap-backed implementation of the persistence interface, used by
//! the demo binary and the test suite. Message ids are assigned from a
//! single monotone sequence, so per-room assignment order is total.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use relay_shared::time::Clock;

use crate::domain::{
    ChatStore, DisplayName, MessageContent, MessageEnvelope, MessageId, MessageKind,
    PresenceStatus, RoomId, StoreError, Timestamp, UserId,
};

struct UserRecord {
    display_name: DisplayName,
    status: PresenceStatus,
    last_seen: Option<Timestamp>,
}

#[derive(Default)]
struct StoreState {
    next_message_id: u64,
    users: HashMap<UserId, UserRecord>,
    rooms: HashMap<RoomId, HashSet<UserId>>,
    messages: HashMap<RoomId, Vec<MessageEnvelope>>,
}

/// HashMap-backed chat store
pub struct InMemoryChatStore {
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

impl InMemoryChatStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Seed a user record
    pub async fn add_user(&self, user_id: UserId, display_name: DisplayName) {
        let mut state = self.state.lock().await;
        state.users.insert(
            user_id,
            UserRecord {
                display_name,
                status: PresenceStatus::Offline,
                last_seen: None,
            },
        );
    }

    /// Seed a room with its participant set
    pub async fn add_room(&self, room_id: RoomId, participants: HashSet<UserId>) {
        let mut state = self.state.lock().await;
        state.rooms.insert(room_id, participants);
    }

    /// Persisted presence of a user (test/debug aid)
    pub async fn status_of(&self, user_id: &UserId) -> Option<(PresenceStatus, Option<Timestamp>)> {
        let state = self.state.lock().await;
        state
            .users
            .get(user_id)
            .map(|record| (record.status, record.last_seen))
    }

    /// Number of messages persisted for a room (test/debug aid)
    pub async fn message_count(&self, room_id: &RoomId) -> usize {
        let state = self.state.lock().await;
        state
            .messages
            .get(room_id)
            .map(Vec::len)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn insert_message(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        content: MessageContent,
        kind: MessageKind,
        reply_to: Option<MessageId>,
    ) -> Result<MessageEnvelope, StoreError> {
        let created_at = Timestamp::new(self.clock.now_utc_millis());
        let mut state = self.state.lock().await;
        let sender_name = state
            .users
            .get(sender)
            .map(|record| record.display_name.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {sender}")))?;

        state.next_message_id += 1;
        let envelope = MessageEnvelope {
            id: MessageId::new(state.next_message_id),
            room_id: room_id.clone(),
            sender: sender.clone(),
            sender_name,
            content,
            kind,
            reply_to,
            created_at,
        };
        state
            .messages
            .entry(room_id.clone())
            .or_default()
            .push(envelope.clone());
        Ok(envelope)
    }

    async fn participants_of(&self, room_id: &RoomId) -> Result<HashSet<UserId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rooms.get(room_id).cloned().unwrap_or_default())
    }

    async fn rooms_of(&self, user_id: &UserId) -> Result<Vec<RoomId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rooms
            .iter()
            .filter(|(_, participants)| participants.contains(user_id))
            .map(|(room_id, _)| room_id.clone())
            .collect())
    }

    async fn message_in_room(
        &self,
        room_id: &RoomId,
        message_id: MessageId,
    ) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .get(room_id)
            .is_some_and(|messages| messages.iter().any(|m| m.id == message_id)))
    }

    async fn set_status(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        last_seen: Timestamp,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        // Unknown identities are a silent no-op, matching UPDATE semantics
        if let Some(record) = state.users.get_mut(user_id) {
            record.status = status;
            record.last_seen = Some(last_seen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_shared::time::FixedClock;

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name.to_string()).unwrap()
    }

    fn content(text: &str) -> MessageContent {
        MessageContent::new(text.to_string()).unwrap()
    }

    async fn seeded_store() -> InMemoryChatStore {
        let store = InMemoryChatStore::new(Arc::new(FixedClock::new(1_000)));
        store
            .add_user(user("alice"), DisplayName::new("Alice".to_string()).unwrap())
            .await;
        store
            .add_user(user("bob"), DisplayName::new("Bob".to_string()).unwrap())
            .await;
        store
            .add_room(room("r1"), HashSet::from([user("alice"), user("bob")]))
            .await;
        store
            .add_room(room("r2"), HashSet::from([user("bob")]))
            .await;
        store
    }

    #[tokio::test]
    async fn test_insert_message_assigns_monotone_ids() {
        // given:
        let store = seeded_store().await;

        // when:
        let first = store
            .insert_message(&room("r1"), &user("alice"), content("one"), MessageKind::Text, None)
            .await
            .unwrap();
        let second = store
            .insert_message(&room("r1"), &user("alice"), content("two"), MessageKind::Text, None)
            .await
            .unwrap();

        // then:
        assert!(second.id > first.id);
        assert_eq!(first.sender_name.as_str(), "Alice");
        assert_eq!(first.created_at, Timestamp::new(1_000));
        assert_eq!(store.message_count(&room("r1")).await, 2);
    }

    #[tokio::test]
    async fn test_insert_message_rejects_unknown_sender() {
        // given:
        let store = seeded_store().await;

        // when:
        let result = store
            .insert_message(
                &room("r1"),
                &user("ghost"),
                content("boo"),
                MessageKind::Text,
                None,
            )
            .await;

        // then:
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.message_count(&room("r1")).await, 0);
    }

    #[tokio::test]
    async fn test_participants_of_unknown_room_is_empty() {
        // given:
        let store = seeded_store().await;

        // when:
        let participants = store.participants_of(&room("nowhere")).await.unwrap();

        // then:
        assert!(participants.is_empty());
    }

    #[tokio::test]
    async fn test_rooms_of_returns_memberships() {
        // given:
        let store = seeded_store().await;

        // when:
        let alice_rooms = store.rooms_of(&user("alice")).await.unwrap();
        let bob_rooms = store.rooms_of(&user("bob")).await.unwrap();

        // then:
        assert_eq!(alice_rooms, vec![room("r1")]);
        assert_eq!(bob_rooms.len(), 2);
    }

    #[tokio::test]
    async fn test_message_in_room_distinguishes_rooms() {
        // given:
        let store = seeded_store().await;
        let envelope = store
            .insert_message(&room("r1"), &user("alice"), content("hi"), MessageKind::Text, None)
            .await
            .unwrap();

        // when / then:
        assert!(store.message_in_room(&room("r1"), envelope.id).await.unwrap());
        assert!(!store.message_in_room(&room("r2"), envelope.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_status_updates_record() {
        // given:
        let store = seeded_store().await;

        // when:
        store
            .set_status(&user("alice"), PresenceStatus::Online, Timestamp::new(2_000))
            .await
            .unwrap();

        // then:
        assert_eq!(
            store.status_of(&user("alice")).await,
            Some((PresenceStatus::Online, Some(Timestamp::new(2_000))))
        );
    }

    #[tokio::test]
    async fn test_set_status_for_unknown_user_is_noop() {
        // given:
        let store = seeded_store().await;

        // when:
        let result = store
            .set_status(&user("ghost"), PresenceStatus::Online, Timestamp::new(2_000))
            .await;

        // then:
        assert!(result.is_ok());
        assert_eq!(store.status_of(&user("ghost")).await, None);
    }
}
