//! Conversation index: latest message per counterpart, newest first.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;
use crate::models::ConversationSummary;
use crate::store::watch::{poll_watch, Feed};
use crate::store::DocumentStore;

use super::room::counterpart;

pub type SummaryFeed = Feed<Vec<ConversationSummary>>;

/// Builds the viewer's conversation list from the message logs. Nothing is
/// cached: every read walks the rooms, so the list can never go stale.
pub struct ConversationIndex {
    store: Arc<dyn DocumentStore>,
    poll_interval: Duration,
}

impl ConversationIndex {
    pub fn new(store: Arc<dyn DocumentStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// One summary per counterpart the viewer has exchanged messages with,
    /// sorted descending by last-message time. Seconds and nanoseconds both
    /// participate in the sort, so same-second conversations still order
    /// deterministically. Rooms with no messages contribute nothing.
    pub async fn summaries(&self, viewer: &str) -> Result<Vec<ConversationSummary>, ChatError> {
        compute(self.store.as_ref(), viewer).await
    }

    /// Re-emit the recomputed list whenever any underlying room log changes.
    pub fn watch(&self, viewer: &str) -> SummaryFeed {
        let store = self.store.clone();
        let viewer = viewer.to_string();
        poll_watch(self.poll_interval, move || {
            let store = store.clone();
            let viewer = viewer.clone();
            async move { compute(store.as_ref(), &viewer).await }
        })
    }
}

async fn compute(
    store: &dyn DocumentStore,
    viewer: &str,
) -> Result<Vec<ConversationSummary>, ChatError> {
    let mut summaries = Vec::new();

    for room in store.room_ids().await? {
        let Some(other) = counterpart(&room, viewer) else {
            continue;
        };
        let mut messages = store.room_messages(&room).await?;
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let Some(last) = messages.last() else {
            continue;
        };
        summaries.push(ConversationSummary {
            counterpart: other.to_string(),
            last_body: last.body.clone(),
            last_at: last.timestamp,
        });
    }

    summaries.sort_by(|a, b| b.last_at.cmp(&a.last_at));
    Ok(summaries)
}
