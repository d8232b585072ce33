//! Document store boundary.
//!
//! Everything durable lives in a managed document store; this layer owns no
//! persistence of its own. `DocumentStore` is the narrow seam the chat,
//! presence, and calling components are injected with.

mod firestore;
mod memory;
pub mod watch;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::models::{CallSession, Message, MessageDraft, PresenceRecord};

/// Document create/read/update calls against the shared store. Live views are
/// built on top of these reads by [`watch`]; the store itself only answers
/// point requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a message to a room's log, creating the room lazily. The store
    /// assigns the id and the timestamp; the returned message carries both.
    async fn append_message(&self, room_id: &str, draft: MessageDraft)
        -> Result<Message, ChatError>;

    /// Full message log for a room, in the store's iteration order. Callers
    /// sort by timestamp before exposing the list.
    async fn room_messages(&self, room_id: &str) -> Result<Vec<Message>, ChatError>;

    /// Ids of every room in the store.
    async fn room_ids(&self) -> Result<Vec<String>, ChatError>;

    /// Overwrite a participant's presence boolean, creating the record lazily.
    async fn set_presence(&self, participant: &str, online: bool) -> Result<(), ChatError>;

    /// Read a participant's presence record. `None` means never seen.
    async fn presence(&self, participant: &str) -> Result<Option<PresenceRecord>, ChatError>;

    /// Read a room's call session record. `None` means no call was ever
    /// placed in this room.
    async fn call_session(&self, room_id: &str) -> Result<Option<CallSession>, ChatError>;

    /// Write a room's call session record (last write wins).
    async fn put_call_session(&self, room_id: &str, session: &CallSession)
        -> Result<(), ChatError>;
}
