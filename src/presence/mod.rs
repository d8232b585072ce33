//! Presence tracker: online/offline boolean per participant.
//!
//! Two states, nothing in between. Session start flips a participant online,
//! logout or a best-effort disconnect signal flips them offline. Writes are
//! idempotent overwrites; there is no error for redundant transitions.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;
use crate::store::watch::{poll_watch, Feed};
use crate::store::DocumentStore;

pub type PresenceFeed = Feed<bool>;

pub struct PresenceTracker {
    store: Arc<dyn DocumentStore>,
    poll_interval: Duration,
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn DocumentStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    pub async fn set_online(&self, participant: &str) -> Result<(), ChatError> {
        self.store.set_presence(participant, true).await
    }

    pub async fn set_offline(&self, participant: &str) -> Result<(), ChatError> {
        self.store.set_presence(participant, false).await
    }

    /// Current state; a participant the store has never seen reads offline.
    pub async fn is_online(&self, participant: &str) -> Result<bool, ChatError> {
        Ok(self
            .store
            .presence(participant)
            .await?
            .map(|record| record.online)
            .unwrap_or(false))
    }

    /// Live feed of a participant's presence. The current state is delivered
    /// first, then only actual transitions; observing online while already
    /// online emits nothing.
    pub fn watch(&self, participant: &str) -> PresenceFeed {
        let store = self.store.clone();
        let participant = participant.to_string();
        poll_watch(self.poll_interval, move || {
            let store = store.clone();
            let participant = participant.clone();
            async move {
                Ok(store
                    .presence(&participant)
                    .await?
                    .map(|record| record.online)
                    .unwrap_or(false))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(2);

    fn tracker() -> (Arc<MemoryStore>, PresenceTracker) {
        let store = Arc::new(MemoryStore::new());
        let tracker = PresenceTracker::new(store.clone(), TICK);
        (store, tracker)
    }

    #[tokio::test]
    async fn test_set_online_twice_is_idempotent() {
        let (store, tracker) = tracker();

        tracker.set_online("u1").await.unwrap();
        let once = store.presence("u1").await.unwrap();
        tracker.set_online("u1").await.unwrap();
        let twice = store.presence("u1").await.unwrap();

        assert_eq!(once, twice);
        assert!(tracker.is_online("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_offline_twice_is_idempotent() {
        let (store, tracker) = tracker();

        tracker.set_offline("u1").await.unwrap();
        let once = store.presence("u1").await.unwrap();
        tracker.set_offline("u1").await.unwrap();
        let twice = store.presence("u1").await.unwrap();

        assert_eq!(once, twice);
        assert!(!tracker.is_online("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_participant_reads_offline() {
        let (_, tracker) = tracker();
        assert!(!tracker.is_online("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_watch_emits_transitions_only() {
        let (_, tracker) = tracker();

        let mut feed = tracker.watch("u1");
        let initial = timeout(WAIT, feed.updates.recv()).await.unwrap().unwrap();
        assert!(!initial);

        tracker.set_online("u1").await.unwrap();
        let next = timeout(WAIT, feed.updates.recv()).await.unwrap().unwrap();
        assert!(next);

        // Online -> Online is a no-op, not an event.
        tracker.set_online("u1").await.unwrap();
        tokio::time::sleep(TICK * 10).await;
        assert!(feed.updates.try_recv().is_err());

        tracker.set_offline("u1").await.unwrap();
        let last = timeout(WAIT, feed.updates.recv()).await.unwrap().unwrap();
        assert!(!last);
    }
}
