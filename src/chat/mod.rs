//! One-to-one chat: room naming, the message log adapter, and the
//! conversation index.

pub mod index;
pub mod messages;
pub mod room;

pub use index::ConversationIndex;
pub use messages::ChatRooms;
pub use room::room_id;
