//! Message store adapter: append to and live-tail a room's ordered log.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;
use crate::models::{Message, MessageDraft, Participant};
use crate::store::watch::{poll_watch, Feed};
use crate::store::DocumentStore;

use super::room::room_id;

/// A live view of one room's full log, re-delivered sorted ascending by
/// timestamp whenever it changes.
pub type MessageFeed = Feed<Vec<Message>>;

/// Append/read/subscribe operations over the rooms collection.
pub struct ChatRooms {
    store: Arc<dyn DocumentStore>,
    poll_interval: Duration,
}

impl ChatRooms {
    pub fn new(store: Arc<dyn DocumentStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Validate and append a message, creating the room lazily. Rejects
    /// whitespace-only bodies before touching the store; the store assigns
    /// the timestamp.
    pub async fn send(
        &self,
        sender: &Participant,
        recipient_id: &str,
        body: &str,
    ) -> Result<Message, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let room = room_id(&sender.id, recipient_id)?;

        let draft = MessageDraft {
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
        };
        let message = self.store.append_message(&room, draft).await?;
        tracing::debug!("appended message {} to room {}", message.id, room);
        Ok(message)
    }

    /// One-shot ordered read of a room's log.
    pub async fn messages(&self, room_id: &str) -> Result<Vec<Message>, ChatError> {
        let mut messages = self.store.room_messages(room_id).await?;
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }

    /// Live-tail a room. Each update carries the full log sorted ascending,
    /// independent of the store's iteration order; the feed's subscription
    /// handle stops delivery.
    pub fn subscribe(&self, room_id: &str) -> MessageFeed {
        let store = self.store.clone();
        let room = room_id.to_string();
        poll_watch(self.poll_interval, move || {
            let store = store.clone();
            let room = room.clone();
            async move {
                let mut messages = store.room_messages(&room).await?;
                messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
                Ok(messages)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use crate::store::MemoryStore;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(2);

    fn participant(id: &str, name: &str) -> Participant {
        Participant {
            id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    fn rooms() -> (Arc<MemoryStore>, ChatRooms) {
        let store = Arc::new(MemoryStore::new());
        let chat = ChatRooms::new(store.clone(), TICK);
        (store, chat)
    }

    /// Receive updates until one with the expected message count arrives.
    async fn recv_len(feed: &mut MessageFeed, len: usize) -> Vec<Message> {
        loop {
            let update = timeout(WAIT, feed.updates.recv())
                .await
                .expect("timed out waiting for update")
                .expect("feed closed");
            if update.len() == len {
                return update;
            }
        }
    }

    #[tokio::test]
    async fn test_whitespace_only_body_writes_nothing() {
        let (store, chat) = rooms();
        let alice = participant("u1", "Alice");

        let err = chat.send(&alice, "u2", "   \n\t ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));

        // No document reached the store, not even the room itself.
        assert!(store.room_ids().await.unwrap().is_empty());
        assert!(store.room_messages("u1_u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_send_is_rejected() {
        let (_, chat) = rooms();
        let alice = participant("u1", "Alice");
        let err = chat.send(&alice, "u1", "hello me").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidParticipants));
    }

    #[tokio::test]
    async fn test_append_round_trip() {
        let (_, chat) = rooms();
        let alice = participant("u1", "Alice");
        let before = Timestamp::now();

        chat.send(&alice, "u2", "hello").await.unwrap();

        let messages = chat.messages("u1_u2").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, "u1");
        assert_eq!(messages[0].body, "hello");
        assert!(messages[0].timestamp >= before);
    }

    #[tokio::test]
    async fn test_two_client_exchange_arrives_in_order() {
        let (_, chat) = rooms();
        let alice = participant("u1", "Alice");
        let bob = participant("u2", "Bob");

        // B tails the room, A sends first.
        let mut feed = chat.subscribe("u1_u2");
        chat.send(&alice, "u2", "hi").await.unwrap();

        let update = recv_len(&mut feed, 1).await;
        assert_eq!(update[0].sender_id, "u1");
        assert_eq!(update[0].body, "hi");

        chat.send(&bob, "u1", "hey").await.unwrap();
        let update = recv_len(&mut feed, 2).await;
        let bodies: Vec<&str> = update.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "hey"]);
        assert!(update[0].timestamp < update[1].timestamp);
    }

    #[tokio::test]
    async fn test_reads_sort_a_scrambled_store_order() {
        let (store, chat) = rooms();
        let at = |seconds| Timestamp { seconds, nanos: 0 };
        let message = |body: &str, ts| Message {
            id: body.to_string(),
            sender_id: "u1".to_string(),
            sender_name: "Alice".to_string(),
            recipient_id: "u2".to_string(),
            body: body.to_string(),
            timestamp: ts,
        };

        // The store iterates in insertion order, which is not timestamp order.
        store.append_raw("u1_u2", message("late", at(30)));
        store.append_raw("u1_u2", message("early", at(10)));
        store.append_raw("u1_u2", message("middle", at(20)));

        let messages = chat.messages("u1_u2").await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["early", "middle", "late"]);

        let mut feed = chat.subscribe("u1_u2");
        let update = recv_len(&mut feed, 3).await;
        let bodies: Vec<&str> = update.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops_delivering() {
        let (_, chat) = rooms();
        let alice = participant("u1", "Alice");

        chat.send(&alice, "u2", "first").await.unwrap();
        let mut feed = chat.subscribe("u1_u2");
        recv_len(&mut feed, 1).await;

        feed.subscription.cancel();
        chat.send(&alice, "u2", "second").await.unwrap();
        tokio::time::sleep(TICK * 10).await;
        assert!(feed.updates.try_recv().is_err());
    }
}
