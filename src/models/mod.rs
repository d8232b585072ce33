//! Data models shared across the chat, presence, and calling components.

mod call;
mod message;
mod presence;
mod summary;

pub use call::{CallKind, CallSession};
pub use message::{Message, MessageDraft, Timestamp};
pub use presence::PresenceRecord;
pub use summary::ConversationSummary;

use serde::{Deserialize, Serialize};

/// A chat participant as the external account system describes them. This
/// layer only ever reads the id and the display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: String,
}
