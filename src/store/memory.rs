//! In-process document store.
//!
//! Backs `--local` demo runs and the test suite. Mirrors the managed store's
//! contract, with one deliberate strengthening: per-room timestamps are
//! strictly increasing (clock ties get a 1 ns bump), so log order is total.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::models::{CallSession, Message, MessageDraft, PresenceRecord, Timestamp};

use super::DocumentStore;

#[derive(Default)]
struct Inner {
    rooms: BTreeMap<String, Vec<Message>>,
    presence: HashMap<String, PresenceRecord>,
    calls: HashMap<String, CallSession>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message with a caller-chosen timestamp. Test-only escape
    /// hatch for constructing same-second histories deterministically.
    #[cfg(test)]
    pub(crate) fn append_raw(&self, room_id: &str, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .push(message);
    }

    /// Create an empty room without any messages. Test-only.
    #[cfg(test)]
    pub(crate) fn touch_room(&self, room_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.rooms.entry(room_id.to_string()).or_default();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append_message(
        &self,
        room_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, ChatError> {
        let mut inner = self.inner.lock().unwrap();
        let log = inner.rooms.entry(room_id.to_string()).or_default();

        let mut timestamp = Timestamp::now();
        if let Some(last) = log.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp.bumped();
            }
        }

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: draft.sender_id,
            sender_name: draft.sender_name,
            recipient_id: draft.recipient_id,
            body: draft.body,
            timestamp,
        };
        log.push(message.clone());
        Ok(message)
    }

    async fn room_messages(&self, room_id: &str) -> Result<Vec<Message>, ChatError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.get(room_id).cloned().unwrap_or_default())
    }

    async fn room_ids(&self) -> Result<Vec<String>, ChatError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.keys().cloned().collect())
    }

    async fn set_presence(&self, participant: &str, online: bool) -> Result<(), ChatError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.presence.entry(participant.to_string()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                // Redundant writes keep the record untouched, so repeating
                // set_online is indistinguishable from calling it once.
                if record.online != online {
                    record.online = online;
                    record.changed_at = Some(Timestamp::now());
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(PresenceRecord {
                    online,
                    changed_at: Some(Timestamp::now()),
                });
            }
        }
        Ok(())
    }

    async fn presence(&self, participant: &str) -> Result<Option<PresenceRecord>, ChatError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.presence.get(participant).copied())
    }

    async fn call_session(&self, room_id: &str) -> Result<Option<CallSession>, ChatError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.calls.get(room_id).copied())
    }

    async fn put_call_session(
        &self,
        room_id: &str,
        session: &CallSession,
    ) -> Result<(), ChatError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.insert(room_id.to_string(), *session);
        Ok(())
    }
}
