//! Conversation summary model

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Derived projection for the conversation list: one entry per counterpart
/// the viewer has exchanged messages with, carrying the latest message and
/// its time. Never persisted; recomputed from the message logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub counterpart: String,
    pub last_body: String,
    pub last_at: Timestamp,
}
